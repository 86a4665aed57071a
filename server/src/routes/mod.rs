pub mod album;
pub mod upload;

#[cfg(test)]
mod test;
