use crate::table::Table;

/// Probabilities at or below this are treated as zero by the
/// information-theoretic measures.
pub const PROB_MIN: f64 = 1e-36;

/// Shannon entropy `-sum(p log2 p)` in bits, over tuples with
/// `p > PROB_MIN`.
pub fn entropy(table: &Table) -> f64 {
    let mut h = 0.0;
    for (_, p) in table.iter() {
        if *p > PROB_MIN {
            h -= p * p.log2();
        }
    }
    h
}

/// Transmission `T(p || q) = sum(p log2 (p/q))` in bits. Tuples where
/// either side is at or below `PROB_MIN` are skipped.
pub fn transmission(p: &Table, q: &Table) -> f64 {
    let mut t = 0.0;
    for (key, pv) in p.iter() {
        if *pv <= PROB_MIN {
            continue;
        }
        let qv = q.get(key).unwrap_or(0.0);
        if qv <= PROB_MIN {
            continue;
        }
        t += pv * (pv / qv).log2();
    }
    t
}

/// `log2(state_space)`: the entropy of the uniform distribution.
pub fn max_entropy(state_space: f64) -> f64 {
    state_space.log2()
}
