//! wrapindex-evm — EVM log fetcher and chunked chain scanner.

pub mod builder;
pub mod fetcher;
pub mod scanner;

pub use builder::ScannerBuilder;
pub use fetcher::{EvmRpcClient, HttpRpcClient, RawLog};
pub use scanner::{ChainScanner, ScanStats, Step, WindowReport};
