pub mod synthetic_delivery;
