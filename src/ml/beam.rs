// ============================================================
// Layer 5 — Beam Bookkeeping
// ============================================================
// The CPU side of beam search: which partial hypotheses
// survive a step, which ones retire on [EOS], and when the
// search can stop. The tensor side (running the decoder for
// every live hypothesis, reordering recurrent state by parent)
// lives in decoding.rs.
//
// Scores are summed log-probabilities, so extending a
// hypothesis can never raise its score. That is what makes the
// stopping rule in `is_done` exact.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct BeamHypothesis {
    /// Generated tokens, `[SOS]` and `[EOS]` excluded
    pub tokens: Vec<u32>,
    /// Sum of per-step log-probabilities, `[EOS]` step included
    pub score:  f32,
}

impl BeamHypothesis {
    pub fn root() -> Self {
        Self { tokens: Vec::new(), score: 0.0 }
    }

    /// Token to feed at the next step.
    pub fn last_token(&self, sos: u32) -> u32 {
        self.tokens.last().copied().unwrap_or(sos)
    }
}

/// Outcome of one beam step.
#[derive(Debug, Default)]
pub struct BeamStep {
    /// (parent index into the previous live beams, extended hypothesis)
    pub continuing: Vec<(usize, BeamHypothesis)>,
    /// Hypotheses that emitted `[EOS]` this step
    pub finished:   Vec<BeamHypothesis>,
}

fn by_score_desc(a: &BeamHypothesis, b: &BeamHypothesis) -> Ordering {
    b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
}

/// Pick the `beam_size` best one-token extensions of `beams`.
///
/// `log_probs` is row-major [beams.len(), vocab_size]. Extensions ending
/// in `eos` are retired into `finished`; they still use up a slot.
pub fn select_candidates(
    beams:      &[BeamHypothesis],
    log_probs:  &[f32],
    vocab_size: usize,
    beam_size:  usize,
    eos:        u32,
) -> BeamStep {
    let mut candidates: Vec<(f32, usize, u32)> = Vec::with_capacity(beams.len() * vocab_size);
    for (parent, beam) in beams.iter().enumerate() {
        let row = &log_probs[parent * vocab_size..(parent + 1) * vocab_size];
        for (token, &lp) in row.iter().enumerate() {
            if lp.is_finite() {
                candidates.push((beam.score + lp, parent, token as u32));
            }
        }
    }

    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    candidates.truncate(beam_size);

    let mut step = BeamStep::default();
    for (score, parent, token) in candidates {
        let tokens = beams[parent].tokens.clone();
        if token == eos {
            step.finished.push(BeamHypothesis { tokens, score });
        } else {
            let mut tokens = tokens;
            tokens.push(token);
            step.continuing.push((parent, BeamHypothesis { tokens, score }));
        }
    }
    step
}

/// True once `beam_size` hypotheses have finished and no live one can
/// still overtake the worst of the best `beam_size` finished ones.
pub fn is_done(finished: &[BeamHypothesis], live: &[BeamHypothesis], beam_size: usize) -> bool {
    if live.is_empty() {
        return true;
    }
    if finished.len() < beam_size {
        return false;
    }

    let mut scores: Vec<f32> = finished.iter().map(|h| h.score).collect();
    scores.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    let worst_kept = scores[beam_size - 1];
    let best_live  = live.iter().map(|h| h.score).fold(f32::NEG_INFINITY, f32::max);

    best_live <= worst_kept
}

/// Best `beam_size` hypotheses, highest score first.
pub fn finalize(mut hypotheses: Vec<BeamHypothesis>, beam_size: usize) -> Vec<BeamHypothesis> {
    hypotheses.sort_by(by_score_desc);
    hypotheses.truncate(beam_size);
    hypotheses
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const EOS: u32 = 3;

    fn hyp(tokens: &[u32], score: f32) -> BeamHypothesis {
        BeamHypothesis { tokens: tokens.to_vec(), score }
    }

    #[test]
    fn test_root_feeds_sos() {
        assert_eq!(BeamHypothesis::root().last_token(2), 2);
        assert_eq!(hyp(&[7, 8], 0.0).last_token(2), 8);
    }

    #[test]
    fn test_select_keeps_top_candidates_across_beams() {
        let beams = vec![hyp(&[5], -1.0), hyp(&[6], -0.5)];
        // vocab of 5: tokens 0..5, EOS = 3
        let log_probs = vec![
            -9.0, -9.0, -9.0, -0.125, -2.0, // beam 0: eos best → -1.125
            -9.0, -9.0, -9.0, -3.0, -0.25,  // beam 1: token 4 → -0.75
        ];
        let step = select_candidates(&beams, &log_probs, 5, 2, EOS);

        assert_eq!(step.continuing, vec![(1, hyp(&[6, 4], -0.75))]);
        assert_eq!(step.finished, vec![hyp(&[5], -1.125)]);
    }

    #[test]
    fn test_select_skips_non_finite() {
        let beams     = vec![hyp(&[], 0.0)];
        let log_probs = vec![f32::NEG_INFINITY, -1.0, f32::NAN, -2.0];
        let step      = select_candidates(&beams, &log_probs, 4, 4, EOS);
        assert_eq!(step.continuing.len(), 1);
        assert_eq!(step.finished.len(), 1);
    }

    #[test]
    fn test_is_done_rules() {
        let finished = vec![hyp(&[1], -1.0), hyp(&[2], -2.0)];

        // not enough finished yet
        assert!(!is_done(&finished[..1], &[hyp(&[9], -5.0)], 2));
        // a live hypothesis can still beat the worst kept one
        assert!(!is_done(&finished, &[hyp(&[9], -1.5)], 2));
        // no live hypothesis can catch up
        assert!(is_done(&finished, &[hyp(&[9], -2.5)], 2));
        // nothing left to extend
        assert!(is_done(&[], &[], 2));
    }

    #[test]
    fn test_finalize_sorts_and_truncates() {
        let out = finalize(vec![hyp(&[1], -3.0), hyp(&[2], -1.0), hyp(&[3], -2.0)], 2);
        assert_eq!(out, vec![hyp(&[2], -1.0), hyp(&[3], -2.0)]);
    }
}
