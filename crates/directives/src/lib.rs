pub mod xpath_extractor;

pub use xpath_extractor::XPathExtractor;
