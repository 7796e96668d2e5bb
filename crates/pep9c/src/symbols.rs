//! Label generation and name-to-label binding.
//!
//! Two infinite lexicographic sequences over the uppercase alphabet provide
//! labels: a forward-ordered one for identifiers (`A`, `B`, …, `Z`, `AA`, …)
//! and a reverse-ordered one for branch and function labels (`Z`, `Y`, …,
//! `A`, `ZZ`, …). The two orderings keep the namespaces visually and
//! generatively disjoint for any practical program size.

use std::collections::HashMap;

/// An identifier matching `_[A-Z0-9_]+` names a compile-time constant
/// (`.EQUATE`, immediate addressing).
pub fn is_constant_ident(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('_')
        && s.len() > 1
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// An identifier ending in `_` names an array variable.
pub fn is_array_ident(s: &str) -> bool {
    s.ends_with('_')
}

/// Map a sequence position to its label: positions 0..26 are the length-1
/// labels, the next 26^2 the length-2 labels, and so on.
fn nth_label(mut n: usize, reversed: bool) -> String {
    let mut len = 1;
    let mut count = 26usize;
    while n >= count {
        n -= count;
        len += 1;
        count *= 26;
    }
    let mut bytes = vec![b'A'; len];
    for slot in bytes.iter_mut().rev() {
        let digit = (n % 26) as u8;
        *slot = if reversed {
            b'Z' - digit
        } else {
            b'A' + digit
        };
        n /= 26;
    }
    debug_assert_eq!(n, 0);
    String::from_utf8(bytes).expect("labels are ASCII")
}

/// An infinite sequence of labels, forward- or reverse-ordered.
#[derive(Debug, Clone)]
pub struct LabelSequence {
    next: usize,
    reversed: bool,
}

impl LabelSequence {
    pub fn forward() -> Self {
        Self {
            next: 0,
            reversed: false,
        }
    }

    pub fn reversed() -> Self {
        Self {
            next: 0,
            reversed: true,
        }
    }
}

impl Iterator for LabelSequence {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let label = nth_label(self.next, self.reversed);
        self.next += 1;
        Some(label)
    }
}

/// Binds names to labels drawn from a [`LabelSequence`]. Once a name is
/// bound its label is stable for the rest of the compilation.
#[derive(Debug)]
pub struct SymbolTable {
    generator: LabelSequence,
    names: HashMap<String, String>,
}

impl SymbolTable {
    pub fn new(generator: LabelSequence) -> Self {
        Self {
            generator,
            names: HashMap::new(),
        }
    }

    /// Return the label bound to `name`, drawing and binding a fresh one on
    /// first use. Idempotent.
    pub fn lookup_or_create(&mut self, name: &str) -> String {
        if let Some(label) = self.names.get(name) {
            return label.clone();
        }
        let label = self.allocate();
        self.names.insert(name.to_string(), label.clone());
        label
    }

    /// Draw the next label without binding it to a name. Used for branch
    /// labels, which are always fresh; sharing the generator with function
    /// labels keeps the two from ever colliding.
    pub fn allocate(&mut self) -> String {
        self.generator.next().expect("label sequence is infinite")
    }

    /// Bind `name` to an explicit label. Fails if `name` is already bound.
    pub fn set(&mut self, name: &str, label: String) -> Result<(), String> {
        if self.names.contains_key(name) {
            return Err(name.to_string());
        }
        self.names.insert(name.to_string(), label);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }
}
