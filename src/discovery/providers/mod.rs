pub mod fixture;
pub mod producthunt;
