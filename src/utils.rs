use memchr::memchr;

/// Iterator over `\n`-terminated lines of a byte slice. The newline is
/// stripped, as is an optional `\r` before it.
pub fn lines(s: &[u8]) -> Lines<'_> {
    Lines { rest: s }
}

pub struct Lines<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.rest.is_empty() {
            return None;
        }
        let (line, rest) = match memchr(b'\n', self.rest) {
            Some(n) => (&self.rest[..n], &self.rest[n + 1..]),
            None => (self.rest, &self.rest[self.rest.len()..]),
        };
        self.rest = rest;
        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }
}

/// Parses an unsigned decimal integer off the front of `s`, advancing past
/// it. `None` if `s` doesn't start with a digit or the value overflows.
pub fn parse_u64(s: &mut &[u8]) -> Option<u64> {
    let mut n = 0;
    let mut v: u64 = 0;
    while n < s.len() && s[n].is_ascii_digit() {
        v = v.checked_mul(10)?.checked_add((s[n] - b'0') as u64)?;
        n += 1;
    }
    if n == 0 {
        return None;
    }
    *s = &s[n..];
    Some(v)
}

/// Signed variant of [`parse_u64`]: an optional leading `-`, then digits.
pub fn parse_i64(s: &mut &[u8]) -> Option<i64> {
    let neg = s.first() == Some(&b'-');
    let mut t = if neg { &s[1..] } else { *s };
    let v = i64::try_from(parse_u64(&mut t)?).ok()?;
    *s = t;
    Some(if neg { -v } else { v })
}

/// Advances past any ASCII spaces or tabs.
pub fn skip_ws(s: &mut &[u8]) {
    while let [b' ' | b'\t', rest @ ..] = *s {
        *s = rest;
    }
}

/// Consumes `tag` off the front of `s` if present.
pub fn eat(s: &mut &[u8], tag: &[u8]) -> bool {
    match s.strip_prefix(tag) {
        Some(rest) => {
            *s = rest;
            true
        }
        None => false,
    }
}

#[test]
fn test_lines() {
    let got: Vec<_> = lines(b"ab\r\ncd\n\nef").collect();
    assert_eq!(got, [&b"ab"[..], b"cd", b"", b"ef"]);
    assert_eq!(lines(b"").count(), 0);
}

#[test]
fn test_parse_int() {
    let mut s = &b"123x"[..];
    assert_eq!(parse_u64(&mut s), Some(123));
    assert_eq!(s, b"x");
    let mut s = &b"-45 "[..];
    assert_eq!(parse_i64(&mut s), Some(-45));
    assert_eq!(s, b" ");
    assert_eq!(parse_i64(&mut &b"-"[..]), None);
    assert_eq!(parse_u64(&mut &b"x"[..]), None);
}

#[test]
fn test_eat_and_skip_ws() {
    let mut s = &b"  \tdiv z 26"[..];
    skip_ws(&mut s);
    assert!(eat(&mut s, b"div z "));
    assert!(!eat(&mut s, b"27"));
    assert_eq!(s, b"26");
}
