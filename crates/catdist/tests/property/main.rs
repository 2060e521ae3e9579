mod adaptation_properties;
mod store_properties;
