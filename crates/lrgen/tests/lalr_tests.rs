use lrgen::{
    build_lalr1_table, build_lr0_table, Action, ConflictKind, Grammar, GrammarBuilder, ParseTable,
    RuleId, StateId, TokenId, END,
};

// minimal shift-reduce loop, just enough to exercise a table; returns
// the reduce sequence on accept
fn drive(
    grammar: &Grammar,
    table: &ParseTable,
    input: &[TokenId],
) -> Result<Vec<RuleId>, String> {
    let mut stack: Vec<StateId> = vec![StateId(0)];
    let mut reduces: Vec<RuleId> = Vec::new();
    let mut pos = 0;

    loop {
        let token = input.get(pos).copied().unwrap_or(END);
        let state = *stack.last().expect("stack never empty");
        match table.action(state, token) {
            Some(Action::Shift(next)) => {
                stack.push(next);
                pos += 1;
            }
            Some(Action::Reduce(rule_id)) => {
                reduces.push(rule_id);
                let rule = grammar.rule(rule_id);
                for _ in 0..rule.right.len() {
                    stack.pop();
                }
                let top = *stack.last().expect("stack never empty");
                match table.action(top, rule.left) {
                    Some(Action::Goto(next)) => stack.push(next),
                    other => return Err(format!("expected goto, found {:?}", other)),
                }
            }
            Some(Action::Accept) => return Ok(reduces),
            other => {
                return Err(format!(
                    "no action for state {} on '{}' ({:?})",
                    state,
                    grammar.token_name(token),
                    other
                ))
            }
        }
    }
}

#[test]
fn arithmetic_parses_with_precedence() {
    let mut builder = GrammarBuilder::new();
    let id = builder.add_token("id");
    let plus = builder.add_token("+");
    let star = builder.add_token("*");
    let lparen = builder.add_token("(");
    let rparen = builder.add_token(")");
    let expr = builder.add_token("expr");
    let term = builder.add_token("term");
    let factor = builder.add_token("factor");

    let rule_add = builder.add_rule(expr, &[expr, plus, term]).expect("rule");
    builder.add_rule(expr, &[term]).expect("rule");
    let rule_mul = builder.add_rule(term, &[term, star, factor]).expect("rule");
    builder.add_rule(term, &[factor]).expect("rule");
    builder
        .add_rule(factor, &[lparen, expr, rparen])
        .expect("rule");
    let rule_id = builder.add_rule(factor, &[id]).expect("rule");
    builder.set_start(expr).expect("set_start");
    let grammar = builder.build().expect("build");

    let (collection, table) = build_lalr1_table(&grammar);
    assert_eq!(collection.len(), 12);
    assert!(!table.has_conflicts());

    // id + id * id
    let reduces = drive(&grammar, &table, &[id, plus, id, star, id]).expect("accept");

    let ids_reduced = reduces.iter().filter(|&&r| r == rule_id).count();
    assert_eq!(ids_reduced, 3);

    // * binds tighter than +: its rule reduces first
    let mul_at = reduces
        .iter()
        .position(|&r| r == rule_mul)
        .expect("* reduced");
    let add_at = reduces
        .iter()
        .position(|&r| r == rule_add)
        .expect("+ reduced");
    assert!(mul_at < add_at);

    // parenthesized input still accepts
    drive(&grammar, &table, &[lparen, id, plus, id, rparen, star, id]).expect("accept");

    // and a malformed one does not
    assert!(drive(&grammar, &table, &[id, plus]).is_err());
}

#[test]
fn dangling_else_reports_shift_reduce_conflict() {
    let mut builder = GrammarBuilder::new();
    let r#if = builder.add_token("if");
    let r#else = builder.add_token("else");
    let other = builder.add_token("other");
    let stmt = builder.add_token("stmt");

    builder
        .add_rule(stmt, &[r#if, stmt, r#else, stmt])
        .expect("rule");
    builder.add_rule(stmt, &[r#if, stmt]).expect("rule");
    builder.add_rule(stmt, &[other]).expect("rule");
    builder.set_start(stmt).expect("set_start");
    let grammar = builder.build().expect("build");

    let (_, table) = build_lalr1_table(&grammar);
    assert!(table.has_conflicts());
    let conflict = &table.conflicts()[0];
    assert_eq!(conflict.kind, ConflictKind::ShiftReduce);
    assert_eq!(conflict.token, r#else);

    // the table is still produced; shift won, so the else binds to the
    // nearest if and the input still parses
    drive(&grammar, &table, &[r#if, other, r#else, other]).expect("accept");
    drive(&grammar, &table, &[r#if, r#if, other, r#else, other]).expect("accept");
}

#[test]
fn unreachable_nonterminal_still_builds() {
    let mut builder = GrammarBuilder::new();
    let id = builder.add_token("id");
    let s = builder.add_token("S");
    // never appears on any right-hand side
    let orphan = builder.add_token("orphan");

    builder.add_rule(s, &[id]).expect("rule");
    builder.add_rule(orphan, &[id]).expect("rule");
    builder.set_start(s).expect("set_start");
    let grammar = builder.build().expect("build");

    assert!(grammar.follow(orphan).is_empty());

    let (_, table) = build_lalr1_table(&grammar);
    assert!(!table.has_conflicts());
    drive(&grammar, &table, &[id]).expect("accept");
}

#[test]
fn nullable_rules_reduce_on_lookahead() {
    let mut builder = GrammarBuilder::new();
    let x = builder.add_token("x");
    let a = builder.add_token("A");
    let empty_rule = builder.add_rule(a, &[]).expect("rule");
    builder.add_rule(a, &[x, a]).expect("rule");
    builder.set_start(a).expect("set_start");
    let grammar = builder.build().expect("build");

    let (_, table) = build_lalr1_table(&grammar);
    assert!(!table.has_conflicts());

    let reduces = drive(&grammar, &table, &[x, x]).expect("accept");
    assert_eq!(reduces.iter().filter(|&&r| r == empty_rule).count(), 1);

    let reduces = drive(&grammar, &table, &[]).expect("accept");
    assert_eq!(reduces, vec![empty_rule]);
}

#[test]
fn slr_and_lalr_agree_on_simple_grammar() {
    let mut builder = GrammarBuilder::new();
    let x = builder.add_token("x");
    let y = builder.add_token("y");
    let s = builder.add_token("S");
    builder.add_rule(s, &[x, y]).expect("rule");
    builder.add_rule(s, &[y]).expect("rule");
    builder.set_start(s).expect("set_start");
    let grammar = builder.build().expect("build");

    let (lr0_states, slr) = build_lr0_table(&grammar);
    let (lalr_states, lalr) = build_lalr1_table(&grammar);
    assert!(!slr.has_conflicts());
    assert!(!lalr.has_conflicts());
    assert_eq!(lr0_states.len(), lalr_states.len());

    for state in 0..slr.n_states() {
        for token in grammar.token_ids() {
            assert_eq!(
                slr.action(StateId(state as u32), token),
                lalr.action(StateId(state as u32), token)
            );
        }
    }
}
