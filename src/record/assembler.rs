//! Reconstruction of nested records from per-column level streams.
//!
//! Every projected leaf is inserted independently: the value stream is
//! walked with a vector of repetition indices, and each `(rep, def, value)`
//! triple is routed down the leaf's path into a shared forest of slots.
//! Sibling columns share structural levels by construction, so independent
//! insertion lands them at the same structural positions.

use crate::error::{Error, Result};
use crate::page::ValueBatch;
use crate::schema::types::SchemaNode;
use crate::schema::Repetition;

use super::value::{Row, Value};

/// How the walker treats one node of a leaf's path.
#[derive(Clone, Copy, Debug, PartialEq)]
enum StepKind {
    /// A plain group: descend into its child slot.
    Struct,
    /// A `LIST`/`MAP`-annotated wrapper: the slot becomes the list itself.
    ListWrapper,
    /// A repeated node: address the element selected by the repetition
    /// index of this depth, possibly entering an element group.
    Repeated,
    /// The leaf: write the value.
    Leaf,
}

#[derive(Clone, Debug)]
struct PathStep {
    kind: StepKind,
    repetition: Repetition,
    /// Definition level of this node (cumulative).
    def_level: u16,
    /// Repetition level of this node (cumulative). Only used by
    /// `Repeated` steps.
    rep_level: u16,
    /// For `Struct` and group-element `Repeated` steps: index of the next
    /// path node among this group's children.
    child_index: usize,
    /// For `Struct` and group-element `Repeated` steps: number of child
    /// slots the group materializes.
    child_count: usize,
    /// For `Repeated` steps: whether the element is a group of fields
    /// (as opposed to a transparent element or a primitive).
    element_is_group: bool,
}

/// The walkable path of one projected leaf.
#[derive(Clone, Debug)]
pub(crate) struct ColumnPath {
    steps: Vec<PathStep>,
    top_slot: usize,
    max_def: u16,
    max_rep: u16,
    utf8: bool,
}

/// The shape of a projected (sub)field, used to turn builder slots into
/// [`Value`]s; this is where `MAP` pairs become map entries.
#[derive(Clone, Debug)]
pub(crate) struct ShapeNode {
    name: String,
    required: bool,
    kind: ShapeKind,
}

#[derive(Clone, Debug)]
enum ShapeKind {
    Leaf,
    Struct(Vec<ShapeNode>),
    List(Box<ShapeNode>),
    Map(Box<ShapeNode>, Box<ShapeNode>),
}

/// Paths and shapes of one projection, built once per reader.
#[derive(Clone, Debug)]
pub(crate) struct Assembly {
    root: ShapeNode,
    paths: Vec<ColumnPath>,
    field_count: usize,
}

/// Builds the assembly for the given projected top-level fields. The
/// resulting paths are in depth-first leaf order, matching the order of
/// the file's columns restricted to the projection.
pub(crate) fn build_assembly(fields: &[SchemaNode]) -> Result<Assembly> {
    let mut paths = vec![];
    let mut shapes = vec![];
    for (top_slot, field) in fields.iter().enumerate() {
        let mut prefix = vec![];
        let shape = build_node(field, top_slot, 0, 0, &mut prefix, &mut paths)?;
        shapes.push(shape);
    }
    Ok(Assembly {
        root: ShapeNode {
            name: String::new(),
            required: true,
            kind: ShapeKind::Struct(shapes),
        },
        paths,
        field_count: fields.len(),
    })
}

fn build_node(
    node: &SchemaNode,
    top_slot: usize,
    def: u16,
    rep: u16,
    prefix: &mut Vec<PathStep>,
    paths: &mut Vec<ColumnPath>,
) -> Result<ShapeNode> {
    let repetition = node.repetition();
    let node_def = def + u16::from(repetition != Repetition::Required);
    let node_rep = rep + u16::from(repetition == Repetition::Repeated);

    match node {
        SchemaNode::Primitive { .. } if repetition == Repetition::Repeated => {
            // a bare repeated primitive is a list of its values
            prefix.push(PathStep {
                kind: StepKind::Repeated,
                repetition,
                def_level: node_def,
                rep_level: node_rep,
                child_index: 0,
                child_count: 0,
                element_is_group: false,
            });
            prefix.push(leaf_step(Repetition::Required, node_def));
            push_path(paths, prefix, top_slot, node_def, node_rep, node);
            prefix.pop();
            prefix.pop();
            Ok(ShapeNode {
                name: node.name().to_string(),
                required: true,
                kind: ShapeKind::List(Box::new(element_leaf_shape())),
            })
        }
        SchemaNode::Primitive { .. } => {
            prefix.push(leaf_step(repetition, node_def));
            push_path(paths, prefix, top_slot, node_def, node_rep, node);
            prefix.pop();
            Ok(ShapeNode {
                name: node.name().to_string(),
                required: repetition == Repetition::Required,
                kind: ShapeKind::Leaf,
            })
        }
        SchemaNode::Group { fields, .. } if node.is_list_wrapper() => {
            let repeated = &fields[0];
            let elem_def = node_def + 1;
            let elem_rep = node_rep + 1;
            prefix.push(PathStep {
                kind: StepKind::ListWrapper,
                repetition,
                def_level: node_def,
                rep_level: node_rep,
                child_index: 0,
                child_count: 0,
                element_is_group: false,
            });
            let element = build_repeated(repeated, top_slot, elem_def, elem_rep, prefix, paths)?;
            prefix.pop();
            Ok(ShapeNode {
                name: node.name().to_string(),
                required: repetition == Repetition::Required,
                kind: ShapeKind::List(Box::new(element)),
            })
        }
        SchemaNode::Group { fields, .. } if node.is_map_wrapper() => {
            let key_value = &fields[0];
            let elem_def = node_def + 1;
            let elem_rep = node_rep + 1;
            prefix.push(PathStep {
                kind: StepKind::ListWrapper,
                repetition,
                def_level: node_def,
                rep_level: node_rep,
                child_index: 0,
                child_count: 0,
                element_is_group: false,
            });
            prefix.push(PathStep {
                kind: StepKind::Repeated,
                repetition: Repetition::Repeated,
                def_level: elem_def,
                rep_level: elem_rep,
                child_index: 0,
                child_count: 2,
                element_is_group: true,
            });
            let mut pair = vec![];
            for (child_index, child) in key_value.fields().iter().enumerate() {
                prefix.last_mut().unwrap().child_index = child_index;
                pair.push(build_node(
                    child, top_slot, elem_def, elem_rep, prefix, paths,
                )?);
            }
            prefix.pop();
            prefix.pop();
            let value = pair.pop().unwrap();
            let key = pair.pop().unwrap();
            Ok(ShapeNode {
                name: node.name().to_string(),
                required: repetition == Repetition::Required,
                kind: ShapeKind::Map(Box::new(key), Box::new(value)),
            })
        }
        SchemaNode::Group { fields, .. } if repetition == Repetition::Repeated => {
            // a bare repeated group is a list of structs
            prefix.push(PathStep {
                kind: StepKind::Repeated,
                repetition,
                def_level: node_def,
                rep_level: node_rep,
                child_index: 0,
                child_count: fields.len(),
                element_is_group: true,
            });
            let mut children = vec![];
            for (child_index, child) in fields.iter().enumerate() {
                prefix.last_mut().unwrap().child_index = child_index;
                children.push(build_node(
                    child, top_slot, node_def, node_rep, prefix, paths,
                )?);
            }
            prefix.pop();
            Ok(ShapeNode {
                name: node.name().to_string(),
                required: true,
                kind: ShapeKind::List(Box::new(ShapeNode {
                    name: node.name().to_string(),
                    required: true,
                    kind: ShapeKind::Struct(children),
                })),
            })
        }
        SchemaNode::Group { fields, .. } => {
            prefix.push(PathStep {
                kind: StepKind::Struct,
                repetition,
                def_level: node_def,
                rep_level: node_rep,
                child_index: 0,
                child_count: fields.len(),
                element_is_group: false,
            });
            let mut children = vec![];
            for (child_index, child) in fields.iter().enumerate() {
                prefix.last_mut().unwrap().child_index = child_index;
                children.push(build_node(
                    child, top_slot, node_def, node_rep, prefix, paths,
                )?);
            }
            prefix.pop();
            Ok(ShapeNode {
                name: node.name().to_string(),
                required: repetition == Repetition::Required,
                kind: ShapeKind::Struct(children),
            })
        }
    }
}

/// Handles the repeated child of a `LIST` wrapper, deciding what the list
/// element is: the repeated node itself (legacy two-level layouts and
/// multi-field groups) or its single child (the standard three-level
/// layout).
fn build_repeated(
    repeated: &SchemaNode,
    top_slot: usize,
    elem_def: u16,
    elem_rep: u16,
    prefix: &mut Vec<PathStep>,
    paths: &mut Vec<ColumnPath>,
) -> Result<ShapeNode> {
    if repeated.repetition() != Repetition::Repeated {
        return Err(Error::corrupt(
            "the child of a LIST wrapper must be repeated",
        ));
    }
    match repeated {
        SchemaNode::Primitive { .. } => {
            // two-level layout: the repeated primitive is the element
            prefix.push(PathStep {
                kind: StepKind::Repeated,
                repetition: Repetition::Repeated,
                def_level: elem_def,
                rep_level: elem_rep,
                child_index: 0,
                child_count: 0,
                element_is_group: false,
            });
            prefix.push(leaf_step(Repetition::Required, elem_def));
            push_path(paths, prefix, top_slot, elem_def, elem_rep, repeated);
            prefix.pop();
            prefix.pop();
            Ok(element_leaf_shape())
        }
        SchemaNode::Group { fields, .. } if fields.len() == 1 && repeated.name() != "array" => {
            // three-level layout: the single child is the element
            prefix.push(PathStep {
                kind: StepKind::Repeated,
                repetition: Repetition::Repeated,
                def_level: elem_def,
                rep_level: elem_rep,
                child_index: 0,
                child_count: 0,
                element_is_group: false,
            });
            let element = build_node(&fields[0], top_slot, elem_def, elem_rep, prefix, paths)?;
            prefix.pop();
            Ok(element)
        }
        SchemaNode::Group { fields, .. } => {
            // the repeated group itself is the element
            prefix.push(PathStep {
                kind: StepKind::Repeated,
                repetition: Repetition::Repeated,
                def_level: elem_def,
                rep_level: elem_rep,
                child_index: 0,
                child_count: fields.len(),
                element_is_group: true,
            });
            let mut children = vec![];
            for (child_index, child) in fields.iter().enumerate() {
                prefix.last_mut().unwrap().child_index = child_index;
                children.push(build_node(
                    child, top_slot, elem_def, elem_rep, prefix, paths,
                )?);
            }
            prefix.pop();
            Ok(ShapeNode {
                name: repeated.name().to_string(),
                required: true,
                kind: ShapeKind::Struct(children),
            })
        }
    }
}

fn leaf_step(repetition: Repetition, def_level: u16) -> PathStep {
    PathStep {
        kind: StepKind::Leaf,
        repetition,
        def_level,
        rep_level: 0,
        child_index: 0,
        child_count: 0,
        element_is_group: false,
    }
}

fn element_leaf_shape() -> ShapeNode {
    ShapeNode {
        name: String::new(),
        required: true,
        kind: ShapeKind::Leaf,
    }
}

fn push_path(
    paths: &mut Vec<ColumnPath>,
    prefix: &[PathStep],
    top_slot: usize,
    max_def: u16,
    max_rep: u16,
    leaf: &SchemaNode,
) {
    paths.push(ColumnPath {
        steps: prefix.to_vec(),
        top_slot,
        max_def,
        max_rep,
        utf8: leaf.is_utf8(),
    });
}

/// The level and value streams of one projected column, covering exactly
/// the records of one batch.
#[derive(Debug)]
pub(crate) struct ColumnLevels {
    /// Empty when the column's maximum repetition level is 0.
    pub rep: Vec<u16>,
    /// Empty when the column's maximum definition level is 0.
    pub def: Vec<u16>,
    /// Dense values of the present positions.
    pub values: ValueBatch,
    /// Number of level slots.
    pub num_values: usize,
}

impl ColumnLevels {
    fn rep_at(&self, i: usize) -> u16 {
        if self.rep.is_empty() {
            0
        } else {
            self.rep[i]
        }
    }

    fn def_at(&self, i: usize) -> u16 {
        if self.def.is_empty() {
            0
        } else {
            self.def[i]
        }
    }

    /// The number of records this column's stream holds.
    pub fn record_count(&self) -> usize {
        if self.rep.is_empty() {
            self.num_values
        } else {
            self.rep.iter().filter(|rep| **rep == 0).count()
        }
    }
}

/// Intermediate state of one record position while columns are inserted.
#[derive(Clone, Debug, PartialEq)]
enum Slot {
    Unset,
    Null,
    Value(Value),
    Group(Vec<Slot>),
    List(Vec<Slot>),
}

fn mark_null(slot: &mut Slot) -> Result<()> {
    match slot {
        Slot::Unset | Slot::Null => {
            *slot = Slot::Null;
            Ok(())
        }
        _ => Err(Error::corrupt(
            "sibling columns disagree on whether a field is null",
        )),
    }
}

fn ensure_group(slot: &mut Slot, child_count: usize) -> Result<&mut Vec<Slot>> {
    if *slot == Slot::Unset {
        *slot = Slot::Group(vec![Slot::Unset; child_count]);
    }
    match slot {
        Slot::Group(children) => Ok(children),
        _ => Err(Error::corrupt(
            "sibling columns disagree on the shape of a group",
        )),
    }
}

fn ensure_list(slot: &mut Slot) -> Result<&mut Vec<Slot>> {
    if *slot == Slot::Unset {
        *slot = Slot::List(vec![]);
    }
    match slot {
        Slot::List(elements) => Ok(elements),
        _ => Err(Error::corrupt(
            "sibling columns disagree on the shape of a list",
        )),
    }
}

fn write_value(slot: &mut Slot, value: Value) -> Result<()> {
    match slot {
        Slot::Unset => {
            *slot = Slot::Value(value);
            Ok(())
        }
        _ => Err(Error::corrupt("a value position was written twice")),
    }
}

fn leaf_value(values: &ValueBatch, index: usize, utf8: bool) -> Result<Value> {
    Ok(match values {
        ValueBatch::Bool(v) => Value::Bool(v[index]),
        ValueBatch::Int32(v) => Value::Int(v[index]),
        ValueBatch::Int64(v) => Value::Long(v[index]),
        ValueBatch::Int96(v) => Value::Int96(v[index]),
        ValueBatch::Float(v) => Value::Float(v[index]),
        ValueBatch::Double(v) => Value::Double(v[index]),
        ValueBatch::Binary { .. } => {
            let bytes = values.binary_value(index).unwrap();
            if utf8 {
                Value::Str(
                    std::str::from_utf8(bytes)
                        .map_err(|_| {
                            Error::corrupt("a string-annotated value holds invalid UTF-8")
                        })?
                        .to_string(),
                )
            } else {
                Value::Bytes(bytes.to_vec())
            }
        }
    })
}

/// Assembles one batch of per-column streams into records.
pub(crate) struct RecordAssembler<'a> {
    assembly: &'a Assembly,
}

impl<'a> RecordAssembler<'a> {
    pub(crate) fn new(assembly: &'a Assembly) -> Self {
        Self { assembly }
    }

    /// Consumes the batch and yields its records. All columns must hold
    /// the same number of records.
    pub(crate) fn assemble(&self, columns: &[ColumnLevels]) -> Result<Vec<Row>> {
        if columns.len() != self.assembly.paths.len() {
            return Err(Error::corrupt(
                "the batch holds a different number of columns than the projection",
            ));
        }
        let record_count = columns
            .first()
            .map(|column| column.record_count())
            .unwrap_or(0);
        let mut records: Vec<Vec<Slot>> = (0..record_count)
            .map(|_| vec![Slot::Unset; self.assembly.field_count])
            .collect();

        for (column, path) in columns.iter().zip(&self.assembly.paths) {
            insert_column(&mut records, column, path)?;
        }

        records
            .into_iter()
            .map(|slots| finalize_record(slots, &self.assembly.root))
            .collect()
    }
}

fn insert_column(
    records: &mut [Vec<Slot>],
    column: &ColumnLevels,
    path: &ColumnPath,
) -> Result<()> {
    let mut idx = vec![0usize; path.max_rep as usize + 1];
    let mut record_index: Option<usize> = None;
    let mut value_cursor = 0usize;

    for i in 0..column.num_values {
        let rep = column.rep_at(i);
        let def = column.def_at(i);
        if rep > path.max_rep || def > path.max_def {
            return Err(Error::corrupt(format!(
                "level ({}, {}) exceeds the declared maxima ({}, {})",
                rep, def, path.max_rep, path.max_def
            )));
        }

        if rep == 0 {
            record_index = Some(record_index.map_or(0, |index| index + 1));
            idx.iter_mut().for_each(|index| *index = 0);
        } else {
            if record_index.is_none() {
                return Err(Error::corrupt(
                    "a column stream must start at a record boundary",
                ));
            }
            if def == 0 {
                return Err(Error::corrupt(
                    "a value with a positive repetition level must have a positive definition level",
                ));
            }
            idx[(rep as usize + 1)..].iter_mut().for_each(|index| *index = 0);
            idx[rep as usize] += 1;
        }

        let record = records.get_mut(record_index.unwrap()).ok_or_else(|| {
            Error::corrupt("column streams disagree on the record count of a batch")
        })?;
        insert_value(record, path, &idx, def, column, &mut value_cursor)?;
    }

    let seen_records = record_index.map_or(0, |index| index + 1);
    if seen_records != records.len() {
        return Err(Error::corrupt(format!(
            "column streams disagree on the record count of a batch ({} vs {})",
            seen_records,
            records.len()
        )));
    }
    Ok(())
}

fn insert_value(
    record: &mut [Slot],
    path: &ColumnPath,
    idx: &[usize],
    def: u16,
    column: &ColumnLevels,
    value_cursor: &mut usize,
) -> Result<()> {
    let mut current = &mut record[path.top_slot];
    for step in &path.steps {
        if step.repetition == Repetition::Optional && step.def_level > def {
            // a structural null at the depth implied by `def`
            return mark_null(current);
        }
        match step.kind {
            StepKind::Struct => {
                let children = ensure_group(current, step.child_count)?;
                current = &mut children[step.child_index];
            }
            StepKind::ListWrapper => {
                ensure_list(current)?;
            }
            StepKind::Repeated => {
                let elements = ensure_list(current)?;
                if step.def_level > def {
                    // the list exists and is empty
                    return Ok(());
                }
                let position = idx[step.rep_level as usize];
                while elements.len() <= position {
                    elements.push(Slot::Unset);
                }
                current = &mut elements[position];
                if step.element_is_group {
                    let children = ensure_group(current, step.child_count)?;
                    current = &mut children[step.child_index];
                }
            }
            StepKind::Leaf => {
                let value = leaf_value(&column.values, *value_cursor, path.utf8)?;
                *value_cursor += 1;
                return write_value(current, value);
            }
        }
    }
    Err(Error::corrupt("a column path ends without a leaf"))
}

fn finalize_record(slots: Vec<Slot>, root: &ShapeNode) -> Result<Row> {
    match finalize_slot(Slot::Group(slots), root)? {
        Value::Group(row) => Ok(row),
        _ => unreachable!("the root shape is a struct"),
    }
}

fn finalize_slot(slot: Slot, shape: &ShapeNode) -> Result<Value> {
    match slot {
        Slot::Unset | Slot::Null => {
            if shape.required {
                Err(Error::corrupt(format!(
                    "the required field {:?} is absent",
                    shape.name
                )))
            } else {
                Ok(Value::Null)
            }
        }
        Slot::Value(value) => match &shape.kind {
            ShapeKind::Leaf => Ok(value),
            _ => Err(Error::corrupt("a leaf value landed on a group position")),
        },
        Slot::Group(children) => match &shape.kind {
            ShapeKind::Struct(fields) => {
                if children.len() != fields.len() {
                    return Err(Error::corrupt("a group has the wrong number of fields"));
                }
                let fields = fields
                    .iter()
                    .zip(children)
                    .map(|(field, child)| {
                        Ok((field.name.clone(), finalize_slot(child, field)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Group(Row::new(fields)))
            }
            _ => Err(Error::corrupt("a group landed on a non-struct position")),
        },
        Slot::List(elements) => match &shape.kind {
            ShapeKind::List(element_shape) => Ok(Value::List(
                elements
                    .into_iter()
                    .map(|element| finalize_slot(element, element_shape))
                    .collect::<Result<Vec<_>>>()?,
            )),
            ShapeKind::Map(key_shape, value_shape) => {
                let entries = elements
                    .into_iter()
                    .map(|element| match element {
                        Slot::Group(mut pair) if pair.len() == 2 => {
                            let value = pair.pop().unwrap();
                            let key = pair.pop().unwrap();
                            Ok((
                                finalize_slot(key, key_shape)?,
                                finalize_slot(value, value_shape)?,
                            ))
                        }
                        _ => Err(Error::corrupt("a map entry is not a key/value pair")),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Map(entries))
            }
            _ => Err(Error::corrupt("a list landed on a non-list position")),
        },
    }
}
