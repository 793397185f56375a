use std::collections::{HashMap, HashSet, VecDeque};

use crate::grammar::{Grammar, RuleId, TokenId, END};
use crate::lr0::StateId;

/// An LR(1) item: an LR(0) item plus one concrete lookahead terminal
/// expected after full recognition of the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lr1Item {
    pub rule: RuleId,
    pub pos: usize,
    pub la: TokenId,
}

impl Lr1Item {
    pub fn next_symbol(&self, grammar: &Grammar) -> Option<TokenId> {
        grammar.rule(self.rule).right.get(self.pos).copied()
    }

    pub fn advance(&self) -> Lr1Item {
        Lr1Item {
            rule: self.rule,
            pos: self.pos + 1,
            la: self.la,
        }
    }
}

#[derive(Debug)]
pub struct Lr1State {
    pub id: StateId,
    pub items: Vec<Lr1Item>,
}

/// Canonical LR(1) states in breadth-first discovery order. Also the
/// output shape of the LALR(1) builder, whose merged states carry the
/// same item type.
#[derive(Debug)]
pub struct Lr1Collection {
    states: Vec<Lr1State>,
    transitions: HashMap<(StateId, TokenId), StateId>,
}

/// LR(1) closure. Expanding a non-terminal after the dot computes the
/// new item's lookahead from FIRST(rest-of-rhs ++ current lookahead),
/// which is how a lookahead propagates into a sub-derivation.
pub fn closure(grammar: &Grammar, items: &[Lr1Item]) -> Vec<Lr1Item> {
    let mut result: Vec<Lr1Item> = Vec::new();
    let mut seen: HashSet<Lr1Item> = HashSet::new();
    for &item in items {
        if seen.insert(item) {
            result.push(item);
        }
    }

    let mut rpos = 0;
    while rpos < result.len() {
        let item = result[rpos];
        rpos += 1;
        let next = match item.next_symbol(grammar) {
            Some(next) => next,
            None => continue,
        };

        let rule = grammar.rule(item.rule);
        let mut rest: Vec<TokenId> = rule.right[item.pos + 1..].to_vec();
        rest.push(item.la);
        let first = grammar.first_of(&rest);

        for &rule2 in grammar.rules_of(next) {
            for la in first.terminals().iter() {
                let new_item = Lr1Item {
                    rule: rule2,
                    pos: 0,
                    la,
                };
                if seen.insert(new_item) {
                    result.push(new_item);
                }
            }
        }
    }

    result.sort();
    result
}

pub fn goto_items(grammar: &Grammar, items: &[Lr1Item], token: TokenId) -> Vec<Lr1Item> {
    let mut advanced: Vec<Lr1Item> = Vec::new();
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

/// Canonical LR(1) collection. Same worklist as the LR(0) engine over
/// (rule, position, lookahead) triples. Exact but exponentially larger
/// than LALR(1) in the worst case; meant as a reference engine for
/// small grammars, not the production path.
pub fn build_lr1_states(grammar: &Grammar) -> Lr1Collection {
    let start_items = closure(
        grammar,
        &[Lr1Item {
            rule: grammar.start_rule(),
            pos: 0,
            la: END,
        }],
    );

    let mut states: Vec<Lr1State> = Vec::new();
    let mut index: HashMap<Vec<Lr1Item>, StateId> = HashMap::new();
    let mut transitions: HashMap<(StateId, TokenId), StateId> = HashMap::new();

    let start_id = StateId(0);
    index.insert(start_items.clone(), start_id);
    states.push(Lr1State {
        id: start_id,
        items: start_items,
    });

    let mut queue: VecDeque<StateId> = VecDeque::new();
    queue.push_back(start_id);

    while let Some(state_id) = queue.pop_front() {
        let items = states[state_id.idx()].items.clone();
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
                    states.push(Lr1State {
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

    Lr1Collection {
        states,
        transitions,
    }
}

impl Lr1Collection {
    pub(crate) fn from_parts(
        states: Vec<Lr1State>,
        transitions: HashMap<(StateId, TokenId), StateId>,
    ) -> Lr1Collection {
        Lr1Collection {
            states,
            transitions,
        }
    }

    pub fn states(&self) -> &[Lr1State] {
        &self.states
    }

    pub fn state(&self, id: StateId) -> &Lr1State {
        &self.states[id.idx()]
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
}
