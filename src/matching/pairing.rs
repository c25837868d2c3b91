use std::cmp::Ordering;
use std::collections::HashMap;

use crate::fingerprint::Fingerprint;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct IndexPair {
    pub(super) template: usize,
    pub(super) candidate: usize,
    pub(super) overlap: f64,
}

/// Greedy assignment: template blocks in descending area order each take the
/// unused candidate block with the highest IoU. Equal IoU falls back to the
/// closer content histogram, then the lower index.
pub(super) fn pair_blocks(template: &Fingerprint, candidate: &Fingerprint) -> Vec<IndexPair> {
    let mut order = (0..template.blocks.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| {
        let area_a = template.blocks[a].bounds.area();
        let area_b = template.blocks[b].bounds.area();
        area_b.total_cmp(&area_a).then(a.cmp(&b))
    });

    let mut used = vec![false; candidate.blocks.len()];
    let mut pairs = Vec::<IndexPair>::new();

    for t in order {
        let source = &template.blocks[t];
        let mut best: Option<(usize, f64, f64)> = None;

        for (c, target) in candidate.blocks.iter().enumerate() {
            if used[c] {
                continue;
            }
            let iou = source.bounds.iou(&target.bounds);
            if iou <= 0.0 {
                continue;
            }
            let distance = source.shape.distance(target.shape);

            let better = match best {
                None => true,
                Some((_, best_iou, best_distance)) => match iou.total_cmp(&best_iou) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => distance < best_distance,
                },
            };
            if better {
                best = Some((c, iou, distance));
            }
        }

        if let Some((c, iou, _)) = best {
            used[c] = true;
            pairs.push(IndexPair {
                template: t,
                candidate: c,
                overlap: iou,
            });
        }
    }

    pairs.sort_by_key(|pair| pair.template);
    pairs
}

pub(super) fn count_similarity(template: &Fingerprint, candidate: &Fingerprint) -> f64 {
    let a = template.block_count;
    let b = candidate.block_count;
    if a == 0 && b == 0 {
        return 1.0;
    }
    a.min(b) as f64 / a.max(b) as f64
}

pub(super) fn overlap_similarity(
    template: &Fingerprint,
    candidate: &Fingerprint,
    pairs: &[IndexPair],
) -> f64 {
    let denominator = template.block_count.max(candidate.block_count);
    if denominator == 0 {
        return 1.0;
    }
    pairs.iter().map(|pair| pair.overlap).sum::<f64>() / denominator as f64
}

/// Fraction of relations that survive the pairing, over the larger relation set.
pub(super) fn adjacency_similarity(
    template: &Fingerprint,
    candidate: &Fingerprint,
    pairs: &[IndexPair],
) -> f64 {
    let total = template.adjacency.len().max(candidate.adjacency.len());
    if total == 0 {
        return 1.0;
    }

    let mapping = pairs
        .iter()
        .map(|pair| (pair.template, pair.candidate))
        .collect::<HashMap<usize, usize>>();

    let preserved = template
        .adjacency
        .iter()
        .filter(|edge| {
            match (mapping.get(&edge.from), mapping.get(&edge.to)) {
                (Some(&from), Some(&to)) => candidate.has(from, to, edge.relation),
                _ => false,
            }
        })
        .count();

    preserved as f64 / total as f64
}
