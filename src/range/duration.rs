use chrono::Duration as ChronoDuration;

/// Parses `<int><unit>` segments (`ms`, `s`, `m`, `h`, `d`), e.g. `5m` or `1h30m`.
pub(crate) fn parse_duration(input: &str) -> Option<ChronoDuration> {
    let normalized = input.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }

    let mut total = ChronoDuration::zero();
    let mut rest = normalized.as_str();

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return None;
        }

        let (number_part, tail) = rest.split_at(digits_end);
        let number = number_part.parse::<i64>().ok()?;

        let unit_end = tail.find(|c: char| c.is_ascii_digit()).unwrap_or(tail.len());
        let (unit_part, remainder) = tail.split_at(unit_end);

        let segment = match unit_part {
            "ms" => ChronoDuration::try_milliseconds(number)?,
            "s" => ChronoDuration::try_seconds(number)?,
            "m" => ChronoDuration::try_minutes(number)?,
            "h" => ChronoDuration::try_hours(number)?,
            "d" => ChronoDuration::try_days(number)?,
            _ => return None,
        };

        total = total.checked_add(&segment)?;
        rest = remainder;
    }

    Some(total)
}
