mod imprint;
mod input;
mod output;
mod settings;

pub use imprint::*;
pub use input::*;
pub use output::*;
pub use settings::*;
