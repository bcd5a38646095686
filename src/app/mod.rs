pub mod inspection_use_case;
pub mod ports;

pub use inspection_use_case::{InspectionUseCase, RenderedReport, SendOutcome, SignOutcome};
