// pass.rs — Pass descriptor module: metadata, dependency resolution, artifact IDs
//
// Declares the compiler's five passes, their dependency edges and the
// artifacts they produce. The pipeline runner uses it to compute the minimal
// pass subset for each --emit target.
//
// Preconditions: none (static tables).
// Postconditions: `required_passes` returns passes in execution order.
// Failure modes: none.
// Side effects: none.

use std::collections::HashSet;

// ── Pass and Artifact identifiers ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Schema,
    Adapt,
    Validate,
    Resolve,
    Serialize,
}

/// Machine-readable artifact identifiers. Each maps to a field of
/// `CompilationState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactId {
    Document,   // schema::Document
    Pipeline,   // model::PipelineModel
    Validation, // errors + warnings
    Resolved,   // model::ResolvedModel
    Explain,    // Vec<ExplainEntry>
    Iseql,      // String
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about a compiler pass.
pub struct PassDescriptor {
    /// Name used in logs.
    pub name: &'static str,
    /// Passes whose outputs this pass consumes.
    pub inputs: &'static [PassId],
    pub outputs: &'static [ArtifactId],
    /// What invalidates this pass's output.
    pub invalidation_key: &'static str,
    /// Postconditions (documentation only).
    pub invariants: &'static str,
}

impl PassId {
    pub fn name(self) -> &'static str {
        descriptor(self).name
    }
}

pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::Schema => PassDescriptor {
            name: "schema",
            inputs: &[],
            outputs: &[ArtifactId::Document],
            invalidation_key: "input document",
            invariants: "tagged shape chosen, ticks/params in domain, interval refs exist",
        },
        PassId::Adapt => PassDescriptor {
            name: "adapt",
            inputs: &[PassId::Schema],
            outputs: &[ArtifactId::Pipeline],
            invalidation_key: "document",
            invariants: "one pipeline shape, origin paths recorded, MISSING_PARAMS queued",
        },
        PassId::Validate => PassDescriptor {
            name: "validate",
            inputs: &[PassId::Adapt],
            outputs: &[ArtifactId::Validation],
            invalidation_key: "pipeline model + catalog",
            invariants: "operators known, refs resolved, params within operator domains",
        },
        PassId::Resolve => PassDescriptor {
            name: "resolve",
            inputs: &[PassId::Validate],
            outputs: &[ArtifactId::Resolved, ArtifactId::Explain],
            invalidation_key: "pipeline model + catalog",
            invariants: "base codes only, five params per relation, id-sorted arrays",
        },
        PassId::Serialize => PassDescriptor {
            name: "serialize",
            inputs: &[PassId::Resolve],
            outputs: &[ArtifactId::Iseql],
            invalidation_key: "resolved model + catalog defaults",
            invariants: "deterministic text, single trailing newline",
        },
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

/// All pass IDs in declaration order.
pub const ALL_PASSES: [PassId; 5] = [
    PassId::Schema,
    PassId::Adapt,
    PassId::Validate,
    PassId::Resolve,
    PassId::Serialize,
];

/// Compute the minimal ordered set of passes needed to produce `terminal`.
/// Returns passes in topological (execution) order.
pub fn required_passes(terminal: PassId) -> Vec<PassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(terminal, &mut visited, &mut order);
    order
}

fn visit(id: PassId, visited: &mut HashSet<PassId>, order: &mut Vec<PassId>) {
    if !visited.insert(id) {
        return;
    }
    for &dep in descriptor(id).inputs {
        visit(dep, visited, order);
    }
    order.push(id);
}

// ── Tests ──────────────────────────────────────────────────────────────────
