pub mod claude;
pub mod knowledge;
pub mod postgres;

#[cfg(test)]
pub mod memory;
#[cfg(test)]
pub mod mock;
