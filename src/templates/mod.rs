pub mod bicep;

pub use bicep::{template_parameters, write_template, InfraComponent};
