use std::cmp::Ordering;
use std::fmt;

/// Vector kept ordered by a caller-supplied comparator.
///
/// Lookups are binary searches. A comparator that is not a total order can
/// send the search in circles; that is detected by capping the number of
/// probes and treated as a bug in the caller.
///
/// # Examples
///
/// ```
/// use codebuilder::sorted_list::SortedList;
///
/// let mut list = SortedList::new(|a: &i32, b: &i32| a.cmp(b));
/// list.add(3);
/// list.add(1);
/// list.add(2);
///
/// assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
/// assert!(list.has(&2));
/// ```
pub struct SortedList<T> {
    items: Vec<T>,
    compare: Box<dyn Fn(&T, &T) -> Ordering>,
}

/// Where an item sits, or would be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub index: usize,
    pub found: bool,
}

impl<T> SortedList<T> {
    pub fn new(compare: impl Fn(&T, &T) -> Ordering + 'static) -> Self {
        SortedList {
            items: Vec::new(),
            compare: Box::new(compare),
        }
    }

    pub fn add(&mut self, item: T) {
        let position = self.find(&item);
        self.items.insert(position.index, item);
    }

    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) {
        for item in items {
            self.add(item);
        }
    }

    /// Removes the item comparing equal to `item`, if any.
    pub fn remove(&mut self, item: &T) -> Option<T> {
        let position = self.find(item);
        position.found.then(|| self.items.remove(position.index))
    }

    pub fn has(&self, item: &T) -> bool {
        self.find(item).found
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Mutable access for edits that leave the sort key unchanged.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// # Panics
    ///
    /// Panics when the comparator needs more than `ceil(log2 n) + 1` probes,
    /// which only happens when it is not a consistent ordering.
    pub fn find(&self, item: &T) -> Position {
        let len = self.items.len();
        let max_probes = (len as f64).log2().ceil().max(0.0) as usize + 1;
        let mut begin = 0;
        let mut end = len;
        let mut probes = 0;

        while begin < end {
            let mid = begin + (end - begin) / 2;
            match (self.compare)(&self.items[mid], item) {
                Ordering::Greater => end = mid,
                Ordering::Less => begin = mid + 1,
                Ordering::Equal => {
                    return Position {
                        index: mid,
                        found: true,
                    };
                }
            }
            probes += 1;
            if probes > max_probes {
                panic!(
                    "sorted list comparator is inconsistent: {} probes exceeded the {} needed for {} items",
                    probes, max_probes, len
                );
            }
        }

        Position {
            index: begin,
            found: false,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<'a, T> IntoIterator for &'a SortedList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for SortedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}
