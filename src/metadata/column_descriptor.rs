use crate::schema::types::{PhysicalType, SchemaNode};

/// A descriptor of a leaf-level primitive column. This encapsulates the
/// maximum definition and repetition levels required to re-assemble nested
/// data from this column's level streams.
#[derive(Debug, PartialEq, Clone)]
pub struct ColumnDescriptor {
    // The leaf primitive node of this column.
    primitive_node: SchemaNode,

    max_def_level: i16,

    max_rep_level: i16,

    // The dotted path of this column, e.g. `a.b.c`.
    path: Vec<String>,

    // The index of this leaf in the schema's depth-first leaf order.
    leaf_index: usize,
}

impl ColumnDescriptor {
    pub(crate) fn new(
        primitive_node: SchemaNode,
        max_def_level: i16,
        max_rep_level: i16,
        path: Vec<String>,
        leaf_index: usize,
    ) -> Self {
        Self {
            primitive_node,
            max_def_level,
            max_rep_level,
            path,
            leaf_index,
        }
    }

    /// Returns the maximum definition level of this column.
    pub fn max_def_level(&self) -> i16 {
        self.max_def_level
    }

    /// Returns the maximum repetition level of this column.
    pub fn max_rep_level(&self) -> i16 {
        self.max_rep_level
    }

    /// The path of this column from the root, one name per step.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The path of this column joined by `.`, used in error messages.
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }

    /// The index of this leaf in the schema's depth-first leaf order.
    pub fn leaf_index(&self) -> usize {
        self.leaf_index
    }

    /// The leaf schema node of this column.
    pub fn primitive_node(&self) -> &SchemaNode {
        &self.primitive_node
    }

    pub fn physical_type(&self) -> PhysicalType {
        // the descriptor is only constructed over primitive nodes.
        self.primitive_node.physical_type().unwrap()
    }

    /// Returns the column (leaf) name.
    pub fn name(&self) -> &str {
        self.primitive_node.name()
    }
}
