mod desc;

pub use desc::GridSpec;
