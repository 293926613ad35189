mod batch;
mod cost;
mod dashboard;
mod evidence;
mod ids;
mod issue;
mod verdict;

pub use batch::*;
pub use cost::*;
pub use dashboard::*;
pub use evidence::*;
pub use ids::*;
pub use issue::*;
pub use verdict::*;
