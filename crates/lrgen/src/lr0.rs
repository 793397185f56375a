use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::Graph;

use lrgen_util::make_type_idx;

use crate::grammar::{Grammar, RuleId, TokenId};

make_type_idx!(StateId, Lr0State);

/// An LR(0) item: a rule with a dot position in its right-hand side.
/// `pos == len(right)` means the rule is fully recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lr0Item {
    pub rule: RuleId,
    pub pos: usize,
}

impl Lr0Item {
    /// Symbol immediately after the dot, or None at the end.
    pub fn next_symbol(&self, grammar: &Grammar) -> Option<TokenId> {
        grammar.rule(self.rule).right.get(self.pos).copied()
    }

    pub fn advance(&self) -> Lr0Item {
        Lr0Item {
            rule: self.rule,
            pos: self.pos + 1,
        }
    }
}

#[derive(Debug)]
pub struct Lr0State {
    pub id: StateId,
    // sorted, deduplicated; state equality is equality of this vec
    pub items: Vec<Lr0Item>,
}

/// The canonical collection of LR(0) states, in breadth-first
/// discovery order, plus the goto/shift transition map.
#[derive(Debug)]
pub struct Lr0Collection {
    states: Vec<Lr0State>,
    transitions: HashMap<(StateId, TokenId), StateId>,
}

/// Closure of an item set: whenever the dot precedes a non-terminal,
/// the items `(rule, 0)` of all its rules join the set. The seen-set
/// keeps cyclic non-terminal dependencies from looping.
pub fn closure(grammar: &Grammar, items: &[Lr0Item]) -> Vec<Lr0Item> {
    let mut result: Vec<Lr0Item> = Vec::new();
    let mut seen: HashSet<Lr0Item> = HashSet::new();
    for &item in items {
        if seen.insert(item) {
            result.push(item);
        }
    }

    let mut rpos = 0;
    while rpos < result.len() {
        let item = result[rpos];
        rpos += 1;
        if let Some(next) = item.next_symbol(grammar) {
            for &rule in grammar.rules_of(next) {
                let new_item = Lr0Item { rule, pos: 0 };
                if seen.insert(new_item) {
                    result.push(new_item);
                }
            }
        }
    }

    result.sort();
    result
}

/// Items reached by shifting `token`: advance the dot of every item
/// whose dot precedes `token`, then close. Empty if nothing qualifies.
pub fn goto_items(grammar: &Grammar, items: &[Lr0Item], token: TokenId) -> Vec<Lr0Item> {
    let mut advanced: Vec<Lr0Item> = Vec::new();
    for item in items {
        if item.next_symbol(grammar) == Some(token) {
            advanced.push(item.advance());
        }
    }
    if advanced.is_empty() {
        return advanced;
    }
    closure(grammar, &advanced)
}

/// Breadth-first construction of the canonical LR(0) collection.
/// States are deduplicated by item-set value, never by identity, and
/// symbols are probed in id order so state numbering is stable.
pub fn build_lr0_states(grammar: &Grammar) -> Lr0Collection {
    let start_items = closure(
        grammar,
        &[Lr0Item {
            rule: grammar.start_rule(),
            pos: 0,
        }],
    );

    let mut states: Vec<Lr0State> = Vec::new();
    let mut index: HashMap<Vec<Lr0Item>, StateId> = HashMap::new();
    let mut transitions: HashMap<(StateId, TokenId), StateId> = HashMap::new();

    let start_id = StateId(0);
    index.insert(start_items.clone(), start_id);
    states.push(Lr0State {
        id: start_id,
        items: start_items,
    });

    let mut queue: VecDeque<StateId> = VecDeque::new();
    queue.push_back(start_id);

    while let Some(state_id) = queue.pop_front() {
        let items = states[state_id].items.clone();
        for token in grammar.token_ids() {
            let next_items = goto_items(grammar, &items, token);
            if next_items.is_empty() {
                continue;
            }
            let next_id = match index.get(&next_items) {
                Some(&id) => id,
                None => {
                    let id = StateId(states.len() as u32);
                    index.insert(next_items.clone(), id);
                    states.push(Lr0State {
                        id,
                        items: next_items,
                    });
                    queue.push_back(id);
                    id
                }
            };
            transitions.insert((state_id, token), next_id);
        }
    }

    Lr0Collection {
        states,
        transitions,
    }
}

impl Lr0Collection {
    pub fn states(&self) -> &[Lr0State] {
        &self.states
    }

    pub fn state(&self, id: StateId) -> &Lr0State {
        &self.states[id]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn transitions(&self) -> &HashMap<(StateId, TokenId), StateId> {
        &self.transitions
    }

    pub fn next_state(&self, state: StateId, token: TokenId) -> Option<StateId> {
        self.transitions.get(&(state, token)).copied()
    }

    /// Kernel items of a state: everything with the dot past position
    /// 0, plus the start-rule item at position 0. Sufficient to
    /// regenerate the full state via closure.
    pub fn kernel_items(&self, grammar: &Grammar, state: StateId) -> Vec<Lr0Item> {
        self.states[state]
            .items
            .iter()
            .copied()
            .filter(|item| item.pos > 0 || item.rule == grammar.start_rule())
            .collect()
    }
}

/// The LR(0) automaton as a petgraph graph, for GraphViz dumps.
pub fn automaton_graph(grammar: &Grammar, collection: &Lr0Collection) -> Graph<String, String> {
    let mut graph: Graph<String, String> = Graph::new();
    let nodes: Vec<_> = collection
        .states()
        .iter()
        .map(|state| graph.add_node(format!("State#{}", state.id)))
        .collect();

    let mut edges: Vec<_> = collection.transitions.iter().collect();
    edges.sort();
    for (&(from, token), &to) in edges {
        graph.add_edge(
            nodes[from.idx()],
            nodes[to.idx()],
            grammar.token_name(token).to_string(),
        );
    }
    graph
}
