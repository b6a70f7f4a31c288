pub mod order_details;
pub mod orders;

pub use order_details::Entity as OrderDetails;
pub use orders::Entity as Orders;
