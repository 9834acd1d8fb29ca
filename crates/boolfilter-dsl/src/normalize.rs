//! Query-tree normalization: `QueryNode` → propositional formula over small
//! integer variables, plus the registry that maps those variables back to
//! predicates.
//!
//! Ids are handed out in first-seen order during one depth-first,
//! left-to-right walk, so structurally identical trees always produce the
//! same formula text.

use std::collections::HashMap;
use std::fmt;

use crate::query::{Atom, AtomicPredicate, QueryNode};

/// Two-way table between predicate atoms and dense ids `0..len()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    atoms: Vec<Atom>,
    ids: HashMap<Atom, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `atom`, inserting it if unseen.
    pub fn intern(&mut self, atom: Atom) -> usize {
        if let Some(&id) = self.ids.get(&atom) {
            return id;
        }
        let id = self.atoms.len();
        self.ids.insert(atom.clone(), id);
        self.atoms.push(atom);
        id
    }

    pub fn id_of(&self, atom: &Atom) -> Option<usize> {
        self.ids.get(atom).copied()
    }

    pub fn atom(&self, id: usize) -> Option<&Atom> {
        self.atoms.get(id)
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Atom)> {
        self.atoms.iter().enumerate()
    }
}

/// Formula text over registry ids: `&`, `|`, prefix `!`, parentheses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Formula(String);

impl Formula {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn normalize(query: &QueryNode) -> (Formula, Registry) {
    let mut registry = Registry::new();
    let mut out = String::new();
    emit(query, &mut registry, &mut out);
    (Formula(out), registry)
}

fn emit(node: &QueryNode, registry: &mut Registry, out: &mut String) {
    match node {
        QueryNode::Leaf(predicate) => emit_leaf(predicate, registry, out),
        QueryNode::And { children, negate } => {
            if *negate {
                out.push('!');
            }
            emit_joined(children, '&', registry, out);
        }
        QueryNode::Or(children) => emit_joined(children, '|', registry, out),
    }
}

fn emit_joined(children: &[QueryNode], op: char, registry: &mut Registry, out: &mut String) {
    out.push('(');
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            out.push(op);
        }
        emit(child, registry, out);
    }
    out.push(')');
}

fn emit_leaf(predicate: &AtomicPredicate, registry: &mut Registry, out: &mut String) {
    if predicate.negate {
        out.push('!');
    }
    let id = registry.intern(predicate.atom());
    out.push_str(&id.to_string());
}
