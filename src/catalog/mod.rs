//! Product catalog: schools, garments, sizes and their prices

pub mod model;
pub mod service;

pub use model::{
    Garment, GarmentInput, Price, PriceAmount, PriceInput, PriceKey, PriceView, ReferenceCount,
    School, SchoolInput, Size, SizeInput,
};
pub use service::{CatalogService, PriceService};
