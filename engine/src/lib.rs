pub mod config;
pub mod dashscope;
pub mod pipeline;

#[cfg(test)]
mod test_util;
