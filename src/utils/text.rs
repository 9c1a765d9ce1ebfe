/// 截断时插入的省略标记
pub const ELISION_MARKER: &str = "\n\n[... 中间内容已省略 ...]\n\n";

/// 按字符预算截断文本，保留首尾两段
///
/// 文本长度不超过预算时原样返回；否则保留开头和结尾各约一半的字符，
/// 中间替换为 [`ELISION_MARKER`]。预算为奇数时开头多保留一个字符，
/// 保证保留的字符总数恰好等于预算。长度按Unicode字符计算。
pub fn truncate_middle(text: &str, budget: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= budget {
        return text.to_string();
    }

    let tail_chars = budget / 2;
    let head_chars = budget - tail_chars;

    let head_end = byte_offset(text, head_chars);
    let tail_start = byte_offset(text, char_count - tail_chars);

    let mut truncated = String::with_capacity(head_end + ELISION_MARKER.len() + text.len() - tail_start);
    truncated.push_str(&text[..head_end]);
    truncated.push_str(ELISION_MARKER);
    truncated.push_str(&text[tail_start..]);
    truncated
}

/// 第 `chars` 个字符对应的字节偏移
fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}
