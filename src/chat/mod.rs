// Chat driver: query in, stream of partial responses out

pub mod driver;

pub use driver::{ChatDriver, ResponseStream};
