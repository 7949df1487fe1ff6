pub mod classes;
pub mod model;
pub mod preprocess;

pub use classes::label_name;
pub use model::{Classification, ClassifierError, Model};
pub use preprocess::preprocess;
