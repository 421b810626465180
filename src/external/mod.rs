pub mod price_provider;
pub mod twelvedata;

#[cfg(test)]
pub mod stub;
