//! Resolved, immutable problem catalogue.
//!
//! The catalogue turns the caller's `Module` and `Student` records into
//! index-based lookup tables used by the engine: group and semester
//! orders, resolved requirement lists, the symmetric exclusion graph, and
//! each student's per-group scan order.
//!
//! A catalogue is built once per input load and shared read-only (via
//! `Arc`) by every run of a search.

use std::collections::{BTreeSet, HashMap};

use super::{Module, Student};
use crate::error::Result;
use crate::validation::validate_input;

/// Undirected mutual-exclusion relation between modules.
///
/// Edges are stored once as `(min, max)` index pairs and mirrored into a
/// per-module partner set, so a query by either endpoint sees the same
/// answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionGraph {
    edges: BTreeSet<(usize, usize)>,
    partners: Vec<BTreeSet<usize>>,
}

impl ExclusionGraph {
    /// Creates an empty graph over `module_count` modules.
    pub fn new(module_count: usize) -> Self {
        Self {
            edges: BTreeSet::new(),
            partners: vec![BTreeSet::new(); module_count],
        }
    }

    /// Adds the edge `a`-`b`. Returns `false` for self-loops and existing edges.
    pub fn add(&mut self, a: usize, b: usize) -> bool {
        if a == b {
            return false;
        }
        let edge = (a.min(b), a.max(b));
        if !self.edges.insert(edge) {
            return false;
        }
        self.partners[a].insert(b);
        self.partners[b].insert(a);
        true
    }

    /// Whether `a` and `b` are mutually exclusive.
    #[inline]
    pub fn excludes(&self, a: usize, b: usize) -> bool {
        self.edges.contains(&(a.min(b), a.max(b)))
    }

    /// Modules mutually exclusive with `module`, in index order.
    pub fn partners(&self, module: usize) -> impl Iterator<Item = usize> + '_ {
        self.partners
            .get(module)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// All edges as `(min, max)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges.iter().copied()
    }

    /// Number of exclusion pairs.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// The validated module and student catalogue.
#[derive(Debug, Clone)]
pub struct Catalogue {
    modules: Vec<Module>,
    students: Vec<Student>,
    module_index: HashMap<String, usize>,
    student_index: HashMap<String, usize>,
    groups: Vec<String>,
    semesters: Vec<String>,
    module_group: Vec<usize>,
    module_semester: Vec<usize>,
    group_modules: Vec<Vec<usize>>,
    requirements: Vec<Vec<usize>>,
    exclusions: ExclusionGraph,
    /// `[student][module]` preference rank.
    ranks: Vec<Vec<Option<u32>>>,
    /// `[student][module]` personal exclusion flag.
    refused: Vec<Vec<bool>>,
    /// `[student][group]` desired credits.
    desired: Vec<Vec<u32>>,
    /// `[student][group]` modules sorted by ascending rank, unranked last.
    scan_order: Vec<Vec<Vec<usize>>>,
}

impl Catalogue {
    /// Validates and resolves the inputs.
    ///
    /// # Errors
    /// [`AllocationError::Validation`](crate::AllocationError::Validation)
    /// listing every structural problem found.
    pub fn new(modules: Vec<Module>, students: Vec<Student>) -> Result<Self> {
        validate_input(&modules, &students)?;

        let module_index: HashMap<String, usize> = modules
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.clone(), i))
            .collect();
        let student_index: HashMap<String, usize> = students
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();

        // Group and semester order: first appearance in the module list.
        let mut groups: Vec<String> = Vec::new();
        let mut semesters: Vec<String> = Vec::new();
        let mut module_group = Vec::with_capacity(modules.len());
        let mut module_semester = Vec::with_capacity(modules.len());
        for m in &modules {
            module_group.push(position_or_push(&mut groups, &m.group));
            module_semester.push(position_or_push(&mut semesters, &m.semester));
        }

        let mut group_modules = vec![Vec::new(); groups.len()];
        for (idx, &g) in module_group.iter().enumerate() {
            group_modules[g].push(idx);
        }

        let requirements: Vec<Vec<usize>> = modules
            .iter()
            .map(|m| {
                let resolved: BTreeSet<usize> = m
                    .requirements
                    .iter()
                    .filter_map(|id| module_index.get(id).copied())
                    .collect();
                resolved.into_iter().collect()
            })
            .collect();

        let mut exclusions = ExclusionGraph::new(modules.len());
        for (idx, m) in modules.iter().enumerate() {
            for other in m.exclusions.iter().filter_map(|id| module_index.get(id)) {
                exclusions.add(idx, *other);
            }
        }

        let ranks: Vec<Vec<Option<u32>>> = students
            .iter()
            .map(|s| modules.iter().map(|m| s.rank_of(&m.id)).collect())
            .collect();
        let refused: Vec<Vec<bool>> = students
            .iter()
            .map(|s| modules.iter().map(|m| s.excludes(&m.id)).collect())
            .collect();
        let desired: Vec<Vec<u32>> = students
            .iter()
            .map(|s| groups.iter().map(|g| s.desired_in(g)).collect())
            .collect();

        let scan_order = ranks
            .iter()
            .map(|student_ranks| {
                group_modules
                    .iter()
                    .map(|members| {
                        let mut order = members.clone();
                        // Stable: equal ranks keep catalogue order.
                        order.sort_by_key(|&m| match student_ranks[m] {
                            Some(rank) => (false, rank),
                            None => (true, 0),
                        });
                        order
                    })
                    .collect()
            })
            .collect();

        tracing::debug!(
            modules = modules.len(),
            students = students.len(),
            groups = groups.len(),
            semesters = semesters.len(),
            exclusion_pairs = exclusions.edge_count(),
            "catalogue resolved"
        );

        Ok(Self {
            modules,
            students,
            module_index,
            student_index,
            groups,
            semesters,
            module_group,
            module_semester,
            group_modules,
            requirements,
            exclusions,
            ranks,
            refused,
            desired,
            scan_order,
        })
    }

    /// All modules in input order.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// All students in input order.
    pub fn students(&self) -> &[Student] {
        &self.students
    }

    /// Module by index.
    pub fn module(&self, idx: usize) -> &Module {
        &self.modules[idx]
    }

    /// Student by index.
    pub fn student(&self, idx: usize) -> &Student {
        &self.students[idx]
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn student_count(&self) -> usize {
        self.students.len()
    }

    /// Group labels in catalogue order.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Semester labels in catalogue order.
    pub fn semesters(&self) -> &[String] {
        &self.semesters
    }

    /// Index of a module ID.
    pub fn module_index(&self, id: &str) -> Option<usize> {
        self.module_index.get(id).copied()
    }

    /// Index of a student ID.
    pub fn student_index(&self, id: &str) -> Option<usize> {
        self.student_index.get(id).copied()
    }

    /// Group index of a module.
    #[inline]
    pub fn group_of(&self, module: usize) -> usize {
        self.module_group[module]
    }

    /// Semester index of a module.
    #[inline]
    pub fn semester_of(&self, module: usize) -> usize {
        self.module_semester[module]
    }

    /// Modules belonging to a group, in catalogue order.
    pub fn modules_in_group(&self, group: usize) -> &[usize] {
        &self.group_modules[group]
    }

    /// Direct requirements of a module (resolved, deduplicated).
    pub fn requirements_of(&self, module: usize) -> &[usize] {
        &self.requirements[module]
    }

    /// The symmetric exclusion relation.
    pub fn exclusions(&self) -> &ExclusionGraph {
        &self.exclusions
    }

    /// Whether two modules are mutually exclusive.
    #[inline]
    pub fn excludes(&self, a: usize, b: usize) -> bool {
        self.exclusions.excludes(a, b)
    }

    /// IDs of the modules mutually exclusive with `module`.
    pub fn exclusion_ids(&self, module: usize) -> Vec<&str> {
        self.exclusions
            .partners(module)
            .map(|m| self.modules[m].id.as_str())
            .collect()
    }

    /// IDs of the direct requirements of `module`.
    pub fn requirement_ids(&self, module: usize) -> Vec<&str> {
        self.requirements[module]
            .iter()
            .map(|&m| self.modules[m].id.as_str())
            .collect()
    }

    /// A student's rank for a module (`None` = unranked).
    #[inline]
    pub fn rank(&self, student: usize, module: usize) -> Option<u32> {
        self.ranks[student][module]
    }

    /// Whether a student personally excludes a module.
    #[inline]
    pub fn refuses(&self, student: usize, module: usize) -> bool {
        self.refused[student][module]
    }

    /// A student's desired credits in a group.
    #[inline]
    pub fn desired(&self, student: usize, group: usize) -> u32 {
        self.desired[student][group]
    }

    /// A student's modules in a group, most preferred first.
    pub fn scan_order(&self, student: usize, group: usize) -> &[usize] {
        &self.scan_order[student][group]
    }

    /// Free places per module at input time.
    pub fn initial_available(&self) -> Vec<u32> {
        self.modules.iter().map(|m| m.available_spaces).collect()
    }
}

fn position_or_push(labels: &mut Vec<String>, label: &str) -> usize {
    match labels.iter().position(|l| l == label) {
        Some(pos) => pos,
        None => {
            labels.push(label.to_string());
            labels.len() - 1
        }
    }
}
