pub mod a001_category;
pub mod a002_brand;
pub mod a003_supplier;
pub mod a004_customer;
pub mod a005_product;
