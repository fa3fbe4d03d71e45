//! The array item: a positional list whose members are whole sequences.

use crate::error::MetapathError;
use crate::types::Sequence;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Default)]
pub struct ArrayValue<N> {
    members: Vec<Sequence<N>>,
}

impl<N: PartialEq + Clone> PartialEq for ArrayValue<N> {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl<N: Clone> ArrayValue<N> {
    pub fn new(members: Vec<Sequence<N>>) -> Self {
        ArrayValue { members }
    }

    pub fn members(&self) -> &[Sequence<N>] {
        &self.members
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// 1-based member access.
    pub fn get(&self, index: i64) -> Result<&Sequence<N>, MetapathError> {
        if index < 1 || index as usize > self.members.len() {
            return Err(MetapathError::ArrayIndexOutOfBounds {
                index,
                size: self.members.len(),
            });
        }
        Ok(&self.members[index as usize - 1])
    }

    pub fn put(&self, index: i64, value: Sequence<N>) -> Result<ArrayValue<N>, MetapathError> {
        if index < 1 || index as usize > self.members.len() {
            return Err(MetapathError::ArrayIndexOutOfBounds {
                index,
                size: self.members.len(),
            });
        }
        let mut members = self.members.clone();
        members[index as usize - 1] = value;
        Ok(ArrayValue { members })
    }

    pub fn append(&self, value: Sequence<N>) -> ArrayValue<N> {
        let mut members = self.members.clone();
        members.push(value);
        ArrayValue { members }
    }

    pub fn insert_before(
        &self,
        index: i64,
        value: Sequence<N>,
    ) -> Result<ArrayValue<N>, MetapathError> {
        if index < 1 || index as usize > self.members.len() + 1 {
            return Err(MetapathError::ArrayIndexOutOfBounds {
                index,
                size: self.members.len(),
            });
        }
        let mut members = self.members.clone();
        members.insert(index as usize - 1, value);
        Ok(ArrayValue { members })
    }

    pub fn remove(&self, index: i64) -> Result<ArrayValue<N>, MetapathError> {
        if index < 1 || index as usize > self.members.len() {
            return Err(MetapathError::ArrayIndexOutOfBounds {
                index,
                size: self.members.len(),
            });
        }
        let mut members = self.members.clone();
        members.remove(index as usize - 1);
        Ok(ArrayValue { members })
    }

    pub fn subarray(&self, start: i64, length: i64) -> Result<ArrayValue<N>, MetapathError> {
        if length < 0 {
            return Err(MetapathError::NegativeArrayLength(length));
        }
        if start < 1 || (start as usize).saturating_add(length as usize) > self.members.len() + 1 {
            return Err(MetapathError::ArrayIndexOutOfBounds {
                index: start,
                size: self.members.len(),
            });
        }
        let begin = start as usize - 1;
        Ok(ArrayValue {
            members: self.members[begin..begin + length as usize].to_vec(),
        })
    }

    pub fn reversed(&self) -> ArrayValue<N> {
        let mut members = self.members.clone();
        members.reverse();
        ArrayValue { members }
    }
}

impl<N: Eq + Clone> Eq for ArrayValue<N> {}

impl<N: Hash + Clone> Hash for ArrayValue<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.members.len().hash(state);
        for member in &self.members {
            for item in member.items() {
                item.hash(state);
            }
        }
    }
}

impl<N: Clone + std::fmt::Debug> fmt::Display for ArrayValue<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "array of {} member(s)", self.members.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metapath_model::TreeNode;

    fn sample() -> ArrayValue<TreeNode<'static>> {
        ArrayValue::new(vec![
            Sequence::from_integer(1),
            Sequence::from_integer(2),
            Sequence::from_integer(3),
        ])
    }

    #[test]
    fn test_get_is_one_based() {
        let a = sample();
        assert_eq!(a.get(1).unwrap(), &Sequence::from_integer(1));
        assert_eq!(a.get(3).unwrap(), &Sequence::from_integer(3));
        assert!(matches!(
            a.get(0),
            Err(MetapathError::ArrayIndexOutOfBounds { index: 0, size: 3 })
        ));
        assert!(a.get(4).is_err());
    }

    #[test]
    fn test_subarray_bounds() {
        let a = sample();
        assert_eq!(a.subarray(2, 2).unwrap().size(), 2);
        assert_eq!(a.subarray(4, 0).unwrap().size(), 0);
        assert!(matches!(
            a.subarray(1, -1),
            Err(MetapathError::NegativeArrayLength(-1))
        ));
        assert!(a.subarray(3, 2).is_err());
    }

    #[test]
    fn test_put_and_remove_are_persistent() {
        let a = sample();
        let b = a.put(2, Sequence::from_integer(9)).unwrap();
        assert_eq!(a.get(2).unwrap(), &Sequence::from_integer(2));
        assert_eq!(b.get(2).unwrap(), &Sequence::from_integer(9));
        let c = a.remove(1).unwrap();
        assert_eq!(c.size(), 2);
        assert_eq!(a.size(), 3);
    }
}
