pub mod forecast;
pub mod goal;
pub mod quote;
pub mod trading;
pub mod watchlist;

pub use forecast::*;
pub use goal::*;
pub use quote::*;
pub use trading::*;
pub use watchlist::*;
