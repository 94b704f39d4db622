pub mod engine;
pub mod parser;
pub mod session;
pub mod view;

pub use engine::BenchmarkEngine;
pub use parser::{decode_completion, decode_line, StreamEvent};
pub use session::{Selection, SessionRunner};
pub use view::LiveView;
