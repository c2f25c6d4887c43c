use crate::ballot::{BallotCount, Outcome};
use stanza::style::{HAlign, Header, MinWidth, Separator, Styles};
use stanza::table::{Col, Row, Table};

/// Tabulates win probabilities, one row per candidate, in descending order of probability.
pub fn tabulate_posterior(candidates: &[String], win_probs: &[f64]) -> Table {
    let mut ranked: Vec<_> = candidates.iter().zip(win_probs).collect();
    ranked.sort_by(|(_, a), (_, b)| b.total_cmp(a));

    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Left)),
            Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)).with(Separator(true)),
            vec!["Candidate".into(), "P(win)".into()],
        ));
    for (candidate, prob) in ranked {
        table.push_row(Row::new(
            Styles::default(),
            vec![candidate.as_str().into(), format!("{prob:.6}").into()],
        ));
    }
    table
}

/// Tabulates sampled ballots, naming each preference, most frequent first.
pub fn tabulate_ballots<O: Outcome>(candidates: &[String], ballots: &[BallotCount<O>]) -> Table {
    let mut sorted: Vec<_> = ballots.iter().collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));

    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(30)).with(HAlign::Left)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)).with(Separator(true)),
            vec!["Count".into(), "Ballot".into()],
        ));
    for bc in sorted {
        let names: Vec<_> = bc
            .ballot
            .preferences()
            .iter()
            .map(|&candidate| candidates.get(candidate).map_or("?", String::as_str))
            .collect();
        table.push_row(Row::new(
            Styles::default(),
            vec![bc.count.to_string().into(), names.join(" > ").into()],
        ));
    }
    table
}
