//! Runtime values and the type lattice they are checked against.

mod array;
mod function;
mod item_type;
mod map;
mod sequence;

pub use array::ArrayValue;
pub use function::FunctionValue;
pub use item_type::{ItemType, KindTest, Occurrence, SequenceType};
pub use map::MapValue;
pub use sequence::{Item, Sequence};
