//! SeaORM entities backing the relational store.

pub mod bank_check;
pub mod category;
pub mod company_settings;
pub mod credit_payment;
pub mod customer;
pub mod invoice;
pub mod invoice_item;
pub mod product;
pub mod quote;
pub mod quote_item;
pub mod sale;
pub mod sale_item;
pub mod stock_movement;
pub mod supplier;
pub mod supplier_transaction;
pub mod user;

pub use bank_check::Entity as BankCheck;
pub use category::Entity as Category;
pub use company_settings::Entity as CompanySettings;
pub use credit_payment::Entity as CreditPayment;
pub use customer::Entity as Customer;
pub use invoice::Entity as Invoice;
pub use invoice_item::Entity as InvoiceItem;
pub use product::Entity as Product;
pub use quote::Entity as Quote;
pub use quote_item::Entity as QuoteItem;
pub use sale::Entity as Sale;
pub use sale_item::Entity as SaleItem;
pub use stock_movement::Entity as StockMovement;
pub use supplier::Entity as Supplier;
pub use supplier_transaction::Entity as SupplierTransaction;
pub use user::Entity as User;
