pub mod defaults;
pub mod errors;
pub mod fci;
pub mod initialization;
pub mod integrals;
pub mod io;
pub mod las;
pub mod properties;
pub mod utils;
