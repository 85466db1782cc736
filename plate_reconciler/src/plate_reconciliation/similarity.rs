/// Levenshtein distance with unit costs over the full dynamic programming table.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let rows = a.len() + 1;
    let cols = b.len() + 1;
    let mut dist = vec![vec![0usize; cols]; rows];

    for (row, line) in dist.iter_mut().enumerate() {
        line[0] = row;
    }
    for col in 0..cols {
        dist[0][col] = col;
    }

    for col in 1..cols {
        for row in 1..rows {
            let cost = if a[row - 1] == b[col - 1] { 0 } else { 1 };
            dist[row][col] = (dist[row - 1][col] + 1)
                .min(dist[row][col - 1] + 1)
                .min(dist[row - 1][col - 1] + cost);
        }
    }

    dist[rows - 1][cols - 1]
}
