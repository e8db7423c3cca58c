pub mod credit;
pub mod customers;
pub mod invoices;
pub mod numbering;
pub mod products;
pub mod quotes;
pub mod reports;
pub mod sales;
pub mod settings;
pub mod stock;
pub mod suppliers;
pub mod users;
