/// A named sequence with uppercased bases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    /// Identifier (FASTA name up to the first whitespace)
    pub id: String,

    /// Bases, uppercased on construction
    pub bases: Vec<u8>,
}

impl Sequence {
    pub fn new(id: impl Into<String>, bases: impl Into<Vec<u8>>) -> Self {
        let mut bases = bases.into();
        bases.make_ascii_uppercase();
        Self {
            id: id.into(),
            bases,
        }
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}
