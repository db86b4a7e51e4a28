pub mod call;
pub mod delivery_challan;
pub mod delivery_challan_item;
pub mod diary_entry;
pub mod product;
pub mod purchase_order;
pub mod purchase_order_item;
pub mod sequence;
pub mod site;
pub mod stock_movement;
