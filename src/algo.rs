use crate::core::*;

const CONJUNCTION: &str = " * ";
const DISJUNCTION: &str = " + ";
const NEGATION: &str = "~";
const TRUE: &str = "1";
const FALSE: &str = "0";
const OF_COURSE: &str = "!";
const WHY_NOT: &str = "?";

/// Renders the subtree rooted at `n` as a formula
///
/// Child formulas are sorted before they are joined, so the result does not
/// depend on the order of children.
pub fn canonical(tree: &Tree, n: NodeIdx) -> String {
    render(tree, n, false)
}

/// Renders the logical negation of the subtree rooted at `n` (every polarity
/// flipped), so that `canonical(a) == dual_form(b)` iff `a` and `b` cancel
pub fn dual_form(tree: &Tree, n: NodeIdx) -> String {
    render(tree, n, true)
}

fn render(tree: &Tree, n: NodeIdx, flip: bool) -> String {
    let node = tree.at(n);
    let color = if flip {
        node.color().flipped()
    } else {
        node.color()
    };

    match node.children() {
        [] => leaf(color, node.label()),
        [child] => {
            // a black loop around a single white region negates it
            let child_color = if flip {
                tree.at(*child).color().flipped()
            } else {
                tree.at(*child).color()
            };
            let negates = color == Color::NegativeMult
                && child_color == Color::PositiveMult;
            exponential_marker(color).to_owned()
                + &render(tree, *child, flip ^ negates)
        }
        children => {
            let mut strings: Vec<String> =
                children.iter().map(|&c| render(tree, c, flip)).collect();
            strings.sort();
            let join = if color.is_negative() {
                DISJUNCTION
            } else {
                CONJUNCTION
            };
            format!("({})", strings.join(join))
        }
    }
}

fn leaf(color: Color, label: Option<&str>) -> String {
    match (color, label) {
        (Color::PositiveMult, None) => TRUE.to_owned(),
        (Color::PositiveMult, Some(l)) => l.to_owned(),
        (Color::NegativeMult, None) => FALSE.to_owned(),
        (Color::NegativeMult, Some(l)) => format!("{}{}", NEGATION, l),
        (c, l) => exponential_marker(c).to_owned() + l.unwrap_or(""),
    }
}

fn exponential_marker(color: Color) -> &'static str {
    match color {
        Color::PositiveExp => OF_COURSE,
        Color::NegativeExp => WHY_NOT,
        _ => "",
    }
}

/// Returns true iff walking up from `from` reaches `to` and every bubble
/// passed on the way (`from` included, `to` excluded) is multiplicative
pub fn multiplicative_path(tree: &Tree, from: NodeIdx, to: NodeIdx) -> bool {
    let mut current = Some(from);
    while let Some(n) = current {
        if n == to {
            return true;
        }
        if !tree.at(n).color().is_multiplicative() {
            return false;
        }
        current = tree.at(n).parent();
    }
    false
}
