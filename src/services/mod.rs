pub mod customization;
pub mod errors;
pub mod installation;
