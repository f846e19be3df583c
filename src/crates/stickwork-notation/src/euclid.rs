//! Euclidean accent placement
//!
//! Spreads a number of accents as evenly as possible over a bar using the
//! Bjorklund algorithm.

/// Distribute `pulses` onsets over `steps` cells.
///
/// # Examples
/// ```
/// use stickwork_notation::euclid::bjorklund;
///
/// // Tresillo
/// let cells = bjorklund(3, 8, 0);
/// assert_eq!(cells, vec![true, false, false, true, false, false, true, false]);
/// ```
pub fn bjorklund(pulses: usize, steps: usize, rotation: usize) -> Vec<bool> {
    if steps == 0 {
        return Vec::new();
    }
    if pulses == 0 {
        return vec![false; steps];
    }
    if pulses >= steps {
        return vec![true; steps];
    }

    let mut heads: Vec<Vec<bool>> = vec![vec![true]; pulses];
    let mut tails: Vec<Vec<bool>> = vec![vec![false]; steps - pulses];

    // Append one tail to each head until at most one tail sequence is left over
    while tails.len() > 1 {
        let pairs = heads.len().min(tails.len());
        let leftover_heads = heads.split_off(pairs);
        let leftover_tails = tails.split_off(pairs);

        for (head, tail) in heads.iter_mut().zip(tails.drain(..)) {
            head.extend(tail);
        }

        tails = if leftover_heads.is_empty() {
            leftover_tails
        } else {
            leftover_heads
        };
    }

    let mut cells: Vec<bool> = heads.into_iter().chain(tails).flatten().collect();
    if rotation > 0 {
        let shift = rotation % cells.len();
        cells.rotate_left(shift);
    }
    cells
}

/// Indices of the onsets of a Euclidean rhythm
pub fn euclidean_accents(pulses: usize, steps: usize, rotation: usize) -> Vec<usize> {
    bjorklund(pulses, steps, rotation)
        .iter()
        .enumerate()
        .filter_map(|(i, &on)| on.then_some(i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate() {
        assert!(bjorklund(3, 0, 0).is_empty());
        assert_eq!(bjorklund(0, 4, 0), vec![false; 4]);
        assert_eq!(bjorklund(9, 8, 0), vec![true; 8]);
    }

    #[test]
    fn test_known_rhythms() {
        assert_eq!(euclidean_accents(3, 8, 0), vec![0, 3, 6]);
        assert_eq!(euclidean_accents(5, 8, 0), vec![0, 2, 3, 5, 6]);
        assert_eq!(euclidean_accents(2, 5, 0), vec![0, 2]);
        assert_eq!(euclidean_accents(4, 16, 0), vec![0, 4, 8, 12]);
    }

    #[test]
    fn test_rotation() {
        assert_eq!(
            bjorklund(3, 8, 1),
            vec![false, false, true, false, false, true, false, true]
        );
    }

    #[test]
    fn test_pulse_count_is_kept() {
        for steps in 1..20 {
            for pulses in 0..=steps {
                let cells = bjorklund(pulses, steps, 0);
                assert_eq!(cells.len(), steps);
                assert_eq!(cells.iter().filter(|&&x| x).count(), pulses);
            }
        }
    }
}
