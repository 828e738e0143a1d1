pub mod evaluator;
pub mod fees;
pub mod scanner;
pub mod walker;

pub use evaluator::RouteEvaluator;
pub use fees::{FeeApplication, FeePolicy};
pub use scanner::RouteScanner;
pub use walker::{floor_to, BookWalker, WalkRequest};
