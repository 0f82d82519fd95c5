mod beer;
mod brewery;

pub use beer::Beer;
pub use brewery::Brewery;
