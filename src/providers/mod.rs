pub mod morningstar;

pub use morningstar::MorningstarProvider;
