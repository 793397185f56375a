use bit_set::BitSet;
use thiserror::Error;

use lrgen_util::make_type_idx;

// everything is dense indices since it is simpler, but maybe less safe
make_type_idx!(TokenId, Token);
make_type_idx!(RuleId, Rule);

/// End-of-input marker `$`. Always registered first, always a terminal.
pub const END: TokenId = TokenId(0);

#[derive(Debug)]
pub struct Token {
    pub name: String,
    // rules with this token on the left side; empty means terminal
    rules: Vec<RuleId>,
}

impl Token {
    pub fn rules(&self) -> &[RuleId] {
        &self.rules
    }
}

#[derive(Debug)]
pub struct Rule {
    pub left: TokenId,
    pub right: Vec<TokenId>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrammarError {
    #[error("rule references unregistered symbol {0}")]
    InvalidSymbol(TokenId),
    #[error("start symbol has already been set")]
    AlreadyInitialized,
    #[error("start symbol was never set")]
    StartNotSet,
}

/// Set of token ids, backed by a bit set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenSet {
    data: BitSet,
}

impl TokenSet {
    pub fn new() -> TokenSet {
        TokenSet {
            data: BitSet::new(),
        }
    }

    pub fn insert(&mut self, token: TokenId) -> bool {
        self.data.insert(token.idx())
    }

    pub fn contains(&self, token: TokenId) -> bool {
        self.data.contains(token.idx())
    }

    pub fn union_with(&mut self, other: &TokenSet) -> bool {
        let before = self.data.len();
        self.data.union_with(&other.data);
        self.data.len() != before
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.data.iter().map(|i| TokenId(i as u32))
    }
}

/// FIRST of a symbol or symbol sequence: the terminals that can begin a
/// derivation, plus a sentinel for "the whole thing can derive empty".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FirstSet {
    terminals: TokenSet,
    empty: bool,
}

impl FirstSet {
    pub fn new() -> FirstSet {
        FirstSet {
            terminals: TokenSet::new(),
            empty: false,
        }
    }

    pub fn terminals(&self) -> &TokenSet {
        &self.terminals
    }

    pub fn contains(&self, token: TokenId) -> bool {
        self.terminals.contains(token)
    }

    pub fn contains_empty(&self) -> bool {
        self.empty
    }

    fn merge(&mut self, other: &FirstSet) -> bool {
        let mut changed = self.terminals.union_with(&other.terminals);
        if other.empty && !self.empty {
            self.empty = true;
            changed = true;
        }
        changed
    }
}

// FIRST of a concatenated sequence, reading the per-token table.
// Short-circuits at the first symbol that cannot derive empty.
fn sequence_first(first: &[FirstSet], seq: &[TokenId]) -> FirstSet {
    let mut result = FirstSet::new();
    let mut all_empty = true;
    for &sym in seq {
        let fs = &first[sym.idx()];
        result.terminals.union_with(&fs.terminals);
        if !fs.empty {
            all_empty = false;
            break;
        }
    }
    result.empty = all_empty;
    result
}

/// Least-fixed-point computation of FIRST and FOLLOW for every token.
///
/// FIRST(terminal) = {terminal}; FIRST(left) grows by FIRST(right) per
/// rule until stable. FOLLOW(augmented start) = {$}; per rule
/// `left -> s1..sn`, FIRST(si+1)\{empty} feeds FOLLOW(si), FOLLOW(left)
/// feeds FOLLOW(si) when si+1 is nullable, and FOLLOW(left) feeds
/// FOLLOW(sn). Both loops only ever add from a finite universe, which
/// guarantees termination.
pub fn compute_first_follow(
    tokens: &[Token],
    rules: &[Rule],
    aug_start: TokenId,
) -> (Vec<FirstSet>, Vec<TokenSet>) {
    let mut first: Vec<FirstSet> = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        let mut fs = FirstSet::new();
        if token.rules.is_empty() {
            fs.terminals.insert(TokenId(i as u32));
        }
        first.push(fs);
    }

    let mut update = true;
    while update {
        update = false;
        for rule in rules {
            let rhs_first = sequence_first(&first, &rule.right);
            if first[rule.left.idx()].merge(&rhs_first) {
                update = true;
            }
        }
    }

    let mut follow: Vec<TokenSet> = vec![TokenSet::new(); tokens.len()];
    follow[aug_start.idx()].insert(END);

    let mut update = true;
    while update {
        update = false;
        for rule in rules {
            let n = rule.right.len();
            if n == 0 {
                continue;
            }
            for i in 0..n - 1 {
                let si = rule.right[i];
                let next_first = first[rule.right[i + 1].idx()].clone();
                if follow[si.idx()].union_with(&next_first.terminals) {
                    update = true;
                }
                if next_first.empty {
                    let left_follow = follow[rule.left.idx()].clone();
                    if follow[si.idx()].union_with(&left_follow) {
                        update = true;
                    }
                }
            }
            let last = rule.right[n - 1];
            let left_follow = follow[rule.left.idx()].clone();
            if follow[last.idx()].union_with(&left_follow) {
                update = true;
            }
        }
    }

    (first, follow)
}

/// Mutable staging area for a grammar. Tokens and rules are registered
/// here; `build` computes the derived sets and yields an immutable
/// [`Grammar`].
pub struct GrammarBuilder {
    tokens: Vec<Token>,
    rules: Vec<Rule>,
    start: Option<StartInfo>,
}

struct StartInfo {
    start_rule: RuleId,
    aug_start: TokenId,
    dummy: TokenId,
}

impl GrammarBuilder {
    pub fn new() -> GrammarBuilder {
        let mut builder = GrammarBuilder {
            tokens: Vec::new(),
            rules: Vec::new(),
            start: None,
        };
        let end = builder.add_token("$");
        assert_eq!(end, END);
        builder
    }

    /// Registers a new symbol. Initially a terminal; a later `add_rule`
    /// with this symbol on the left reclassifies it.
    pub fn add_token(&mut self, name: &str) -> TokenId {
        TokenId::from_push(
            &mut self.tokens,
            Token {
                name: name.to_string(),
                rules: Vec::new(),
            },
        )
    }

    /// Registers a production. Every referenced symbol must already be
    /// registered.
    pub fn add_rule(&mut self, left: TokenId, right: &[TokenId]) -> Result<RuleId, GrammarError> {
        self.check_token(left)?;
        for &sym in right {
            self.check_token(sym)?;
        }
        let rule = RuleId::from_push(
            &mut self.rules,
            Rule {
                left,
                right: right.to_vec(),
            },
        );
        self.tokens[left].rules.push(rule);
        Ok(rule)
    }

    /// Fixes the start symbol. Injects the augmenting non-terminal
    /// `_start_`, the rule `_start_ -> start`, and the placeholder
    /// terminal `_dummy_` that never appears in any real rule (the
    /// LALR(1) builder uses it as an unbound lookahead).
    pub fn set_start(&mut self, start: TokenId) -> Result<(), GrammarError> {
        if self.start.is_some() {
            return Err(GrammarError::AlreadyInitialized);
        }
        self.check_token(start)?;
        let aug_start = self.add_token("_start_");
        let start_rule = self.add_rule(aug_start, &[start])?;
        let dummy = self.add_token("_dummy_");
        self.start = Some(StartInfo {
            start_rule,
            aug_start,
            dummy,
        });
        Ok(())
    }

    /// Finalizes the grammar: computes FIRST/FOLLOW and freezes
    /// everything.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        let start = self.start.ok_or(GrammarError::StartNotSet)?;
        let (first, follow) = compute_first_follow(&self.tokens, &self.rules, start.aug_start);
        Ok(Grammar {
            tokens: self.tokens,
            rules: self.rules,
            start_rule: start.start_rule,
            aug_start: start.aug_start,
            dummy: start.dummy,
            first,
            follow,
        })
    }

    fn check_token(&self, token: TokenId) -> Result<(), GrammarError> {
        if token.idx() < self.tokens.len() {
            Ok(())
        } else {
            Err(GrammarError::InvalidSymbol(token))
        }
    }
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        GrammarBuilder::new()
    }
}

/// An analyzed grammar: tokens, rules, the augmented start rule, and
/// the FIRST/FOLLOW tables. Read-only once built; the item-set engines
/// and table builders derive everything else from it.
#[derive(Debug)]
pub struct Grammar {
    tokens: Vec<Token>,
    rules: Vec<Rule>,
    start_rule: RuleId,
    aug_start: TokenId,
    dummy: TokenId,
    first: Vec<FirstSet>,
    follow: Vec<TokenSet>,
}

impl Grammar {
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn token_ids(&self) -> impl Iterator<Item = TokenId> {
        (0..self.tokens.len() as u32).map(TokenId)
    }

    pub fn token_name(&self, token: TokenId) -> &str {
        &self.tokens[token].name
    }

    /// Terminal status is inferred: a token is a terminal iff no rule
    /// has it on the left side.
    pub fn is_terminal(&self, token: TokenId) -> bool {
        self.tokens[token].rules.is_empty()
    }

    pub fn rule(&self, rule: RuleId) -> &Rule {
        &self.rules[rule]
    }

    /// Rules with `token` on the left side.
    pub fn rules_of(&self, token: TokenId) -> &[RuleId] {
        &self.tokens[token].rules
    }

    /// The augmenting rule `_start_ -> start`.
    pub fn start_rule(&self) -> RuleId {
        self.start_rule
    }

    pub fn augmented_start(&self) -> TokenId {
        self.aug_start
    }

    /// The placeholder terminal used as an unbound lookahead.
    pub fn dummy_token(&self) -> TokenId {
        self.dummy
    }

    pub fn first(&self, token: TokenId) -> &FirstSet {
        &self.first[token.idx()]
    }

    pub fn follow(&self, token: TokenId) -> &TokenSet {
        &self.follow[token.idx()]
    }

    /// FIRST of a concatenated symbol sequence; contains the empty
    /// marker iff every symbol in the sequence is nullable.
    pub fn first_of(&self, seq: &[TokenId]) -> FirstSet {
        sequence_first(&self.first, seq)
    }
}
