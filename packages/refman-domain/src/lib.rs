pub mod field;
pub mod keywords;
pub mod normalize;

pub use field::Field;
pub use keywords::RenamePlan;
pub use normalize::{
	FillMode, HeadFields, HeadValues, StorageShape, StoredEntry, WireRecord, from_storage_shape,
	merge_details, to_storage_shape,
};
