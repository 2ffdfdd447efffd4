//! Raw yEnc byte transforms shared by the decoder and encoder
//!
//! yEnc maps each byte to `(byte + 42) mod 256` and escapes the handful of
//! values that would collide with line framing as `=` followed by
//! `(value + 64) mod 256`. Every transform here exists twice: a
//! byte-at-a-time reference version and a run-scanning accelerated version.
//! The two must produce identical output for every input; callers pick one
//! per codec instance.

/// Strip one trailing LF and an optional preceding CR from a raw line
pub(crate) fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Encoded bytes that must be escaped wherever they occur
fn is_critical(encoded: u8) -> bool {
    matches!(encoded, 0x00 | b'\n' | b'\r' | b'=')
}

/// Encoded bytes additionally escaped in column zero
///
/// A leading dot collides with NNTP dot-stuffing and a leading TAB with
/// whitespace-stripping relays, so the encoder always escapes both there.
fn is_column_zero_escape(encoded: u8) -> bool {
    matches!(encoded, b'.' | b'\t')
}

/// Reverse the yEnc mapping for one line payload, reference version
///
/// Stray NUL/CR/LF bytes are dropped; an escape with nothing after it is
/// dropped as well. Both are tolerance for broken posters.
pub(crate) fn decode_line_slow(line: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < line.len() {
        match line[i] {
            0x00 | b'\n' | b'\r' => i += 1,
            b'=' => {
                if i + 1 < line.len() {
                    out.push(line[i + 1].wrapping_sub(64).wrapping_sub(42));
                    i += 2;
                } else {
                    // dangling escape at end of line
                    i += 1;
                }
            }
            b => {
                out.push(b.wrapping_sub(42));
                i += 1;
            }
        }
    }
}

/// Reverse the yEnc mapping for one line payload, accelerated version
///
/// Scans for the next byte needing special handling and bulk-maps the clean
/// run before it. Output is byte-identical to [`decode_line_slow`].
pub(crate) fn decode_line_fast(line: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < line.len() {
        let run_end = line[i..]
            .iter()
            .position(|&b| matches!(b, 0x00 | b'\n' | b'\r' | b'='))
            .map_or(line.len(), |p| i + p);
        out.extend(line[i..run_end].iter().map(|b| b.wrapping_sub(42)));
        i = run_end;
        if i >= line.len() {
            break;
        }
        if line[i] == b'=' {
            if i + 1 < line.len() {
                out.push(line[i + 1].wrapping_sub(64).wrapping_sub(42));
                i += 2;
            } else {
                i += 1;
            }
        } else {
            i += 1;
        }
    }
}

/// Apply the yEnc mapping to a chunk of raw bytes, reference version
///
/// `col` carries the current output column across calls so a part can be
/// encoded chunk-wise; an escape counts as two columns and is never split
/// across a line break. Lines are terminated with CRLF at `line_length`
/// columns.
pub(crate) fn encode_chunk_slow(data: &[u8], line_length: usize, col: &mut usize, out: &mut Vec<u8>) {
    for &b in data {
        let e = b.wrapping_add(42);
        let mut escape = is_critical(e) || (*col == 0 && is_column_zero_escape(e));
        let width = if escape { 2 } else { 1 };
        if *col + width > line_length {
            out.extend_from_slice(b"\r\n");
            *col = 0;
            // the byte now sits in column zero; re-check the escape set
            escape = is_critical(e) || is_column_zero_escape(e);
        }
        if escape {
            out.push(b'=');
            out.push(e.wrapping_add(64));
            *col += 2;
        } else {
            out.push(e);
            *col += 1;
        }
    }
}

/// Apply the yEnc mapping to a chunk of raw bytes, accelerated version
///
/// Bulk-maps runs of plain bytes bounded by the remaining columns on the
/// current line. Output is byte-identical to [`encode_chunk_slow`].
pub(crate) fn encode_chunk_fast(data: &[u8], line_length: usize, col: &mut usize, out: &mut Vec<u8>) {
    let mut i = 0;
    while i < data.len() {
        if *col >= line_length {
            out.extend_from_slice(b"\r\n");
            *col = 0;
        }
        let e = data[i].wrapping_add(42);
        if is_critical(e) || (*col == 0 && is_column_zero_escape(e)) {
            if *col + 2 > line_length {
                out.extend_from_slice(b"\r\n");
                *col = 0;
            }
            out.push(b'=');
            out.push(e.wrapping_add(64));
            *col += 2;
            i += 1;
            continue;
        }
        let room = line_length - *col;
        let limit = data.len().min(i + room);
        let run_end = data[i..limit]
            .iter()
            .position(|&b| is_critical(b.wrapping_add(42)))
            .map_or(limit, |p| i + p);
        out.extend(data[i..run_end].iter().map(|b| b.wrapping_add(42)));
        *col += run_end - i;
        i = run_end;
    }
}

/// Terminate the final encoded line, if one is open
pub(crate) fn encode_finish(col: &mut usize, out: &mut Vec<u8>) {
    if *col > 0 {
        out.extend_from_slice(b"\r\n");
        *col = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_all_slow(data: &[u8], line_length: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut col = 0;
        encode_chunk_slow(data, line_length, &mut col, &mut out);
        encode_finish(&mut col, &mut out);
        out
    }

    fn encode_all_fast(data: &[u8], line_length: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut col = 0;
        encode_chunk_fast(data, line_length, &mut col, &mut out);
        encode_finish(&mut col, &mut out);
        out
    }

    fn decode_all(encoded: &[u8], fast: bool) -> Vec<u8> {
        let mut out = Vec::new();
        for line in encoded.split(|&b| b == b'\n') {
            let line = trim_line_end(line);
            if fast {
                decode_line_fast(line, &mut out);
            } else {
                decode_line_slow(line, &mut out);
            }
        }
        out
    }

    #[test]
    fn test_trim_line_end() {
        assert_eq!(trim_line_end(b"abc\r\n"), b"abc");
        assert_eq!(trim_line_end(b"abc\n"), b"abc");
        assert_eq!(trim_line_end(b"abc"), b"abc");
        assert_eq!(trim_line_end(b"abc\r"), b"abc");
        assert_eq!(trim_line_end(b"\r\n"), b"");
    }

    #[test]
    fn test_decode_plain_byte() {
        let mut out = Vec::new();
        // 'A' (65) encodes to 107 = 'k'
        decode_line_slow(b"k", &mut out);
        assert_eq!(out, b"A");
    }

    #[test]
    fn test_decode_escape() {
        // 0x00 encodes to 42, escaped as "=j" (42 + 64 = 106 = 'j')
        let mut out = Vec::new();
        decode_line_slow(b"=j", &mut out);
        assert_eq!(out, b"\x00");
    }

    #[test]
    fn test_decode_drops_stray_bytes() {
        let mut out = Vec::new();
        decode_line_slow(b"k\x00k\rk\nk", &mut out);
        assert_eq!(out, b"AAAA");
    }

    #[test]
    fn test_decode_drops_dangling_escape() {
        let mut out = Vec::new();
        decode_line_slow(b"kk=", &mut out);
        assert_eq!(out, b"AA");

        let mut out = Vec::new();
        decode_line_fast(b"kk=", &mut out);
        assert_eq!(out, b"AA");
    }

    #[test]
    fn test_encode_escapes_critical_bytes() {
        // raw bytes whose encoded forms are NUL, LF, CR and '='
        let data = [214u8, 224, 227, 19];
        let encoded = encode_all_slow(&data, 128);
        assert_eq!(encoded, b"=@=J=M=}\r\n");
    }

    #[test]
    fn test_encode_escapes_leading_dot_and_tab() {
        // 4 (46 - 42) encodes to '.'; 223 encodes to TAB
        let encoded = encode_all_slow(&[4, 4, 223], 128);
        assert_eq!(encoded, b"=n.\t\r\n");
    }

    #[test]
    fn test_encode_line_breaks_and_escape_width() {
        // line_length 16: a run of 'A' (107 = 'k') breaks every 16 columns
        let data = vec![b'A'; 20];
        let encoded = encode_all_slow(&data, 16);
        assert_eq!(encoded, b"kkkkkkkkkkkkkkkk\r\nkkkk\r\n");

        // an escape pair at column 15 moves whole to the next line
        let mut data = vec![b'A'; 15];
        data.push(214); // encodes to NUL, must be escaped
        let encoded = encode_all_slow(&data, 16);
        assert_eq!(encoded, b"kkkkkkkkkkkkkkk\r\n=@\r\n");
    }

    #[test]
    fn test_dot_escaped_after_line_break() {
        // the 17th byte lands in column zero of the second line
        let mut data = vec![b'A'; 16];
        data.push(4); // encodes to '.'
        let encoded = encode_all_slow(&data, 16);
        assert_eq!(encoded, b"kkkkkkkkkkkkkkkk\r\n=n\r\n");
    }

    #[test]
    fn test_fast_and_slow_encode_identical() {
        let all_bytes: Vec<u8> = (0u8..=255).collect();
        for line_length in [16, 17, 32, 63, 128, 1024] {
            assert_eq!(
                encode_all_slow(&all_bytes, line_length),
                encode_all_fast(&all_bytes, line_length),
                "line_length={}",
                line_length
            );
        }
    }

    #[test]
    fn test_fast_and_slow_decode_identical() {
        let all_bytes: Vec<u8> = (0u8..=255).collect();
        let encoded = encode_all_slow(&all_bytes, 45);
        assert_eq!(decode_all(&encoded, false), decode_all(&encoded, true));
        assert_eq!(decode_all(&encoded, false), all_bytes);
    }

    #[test]
    fn test_round_trip_all_bytes_chunked() {
        // chunk boundaries must not change the output
        let all_bytes: Vec<u8> = (0u8..=255).cycle().take(1000).collect();
        let whole = encode_all_fast(&all_bytes, 128);

        let mut chunked = Vec::new();
        let mut col = 0;
        for chunk in all_bytes.chunks(7) {
            encode_chunk_fast(chunk, 128, &mut col, &mut chunked);
        }
        encode_finish(&mut col, &mut chunked);
        assert_eq!(whole, chunked);
        assert_eq!(decode_all(&whole, true), all_bytes);
    }
}
