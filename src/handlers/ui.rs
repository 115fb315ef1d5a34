// src/handlers/ui.rs
//! The single page: rendering only, every event goes to the JSON API

use axum::{response::Html, routing::get, Router};

pub fn ui_routes() -> Router {
    Router::new()
        .route("/", get(app_page))
        .route("/app", get(app_page))
}

pub async fn app_page() -> Html<String> {
    let html = r###"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>ClearView AI</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
               background: linear-gradient(135deg, #020617, #0f172a 60%, #1e293b); color: #e2e8f0; min-height: 100vh; }
        header { display: flex; justify-content: space-between; align-items: center; padding: 16px 32px;
                 border-bottom: 1px solid rgba(255,255,255,0.05); }
        .brand { font-size: 20px; font-weight: 700; }
        nav button { background: transparent; color: #94a3b8; border: none; padding: 8px 16px; border-radius: 8px; cursor: pointer; }
        nav button.active { background: #334155; color: #fff; }
        main { max-width: 960px; margin: 0 auto; padding: 48px 16px; }
        h1 { text-align: center; font-size: 40px; margin-bottom: 12px; }
        .lead { text-align: center; color: #94a3b8; margin-bottom: 40px; }
        .card { background: rgba(30,41,59,0.3); border: 1px solid rgba(255,255,255,0.05); border-radius: 24px; padding: 28px; }
        .dropzone { border: 2px dashed #475569; border-radius: 16px; padding: 56px; text-align: center; cursor: pointer; }
        .dropzone.dragging { border-color: #0ea5e9; background: rgba(14,165,233,0.08); }
        .preview { position: relative; border-radius: 16px; overflow: hidden; background: #000; aspect-ratio: 16/9; }
        .preview img { width: 100%; height: 100%; object-fit: contain; }
        .preview .clear { position: absolute; top: 12px; right: 12px; }
        textarea, input[type=password] { width: 100%; background: rgba(15,23,42,0.5); color: #e2e8f0;
                   border: 1px solid #334155; border-radius: 12px; padding: 12px; margin-top: 8px; }
        textarea { height: 96px; resize: none; }
        .note { font-size: 12px; color: #bfdbfe; background: rgba(59,130,246,0.1); border-radius: 8px; padding: 10px; margin-top: 8px; }
        .error { color: #fecaca; background: rgba(239,68,68,0.1); border: 1px solid rgba(239,68,68,0.2);
                 border-radius: 12px; padding: 14px; margin: 16px 0; }
        .btn { background: #0284c7; color: #fff; border: none; border-radius: 12px; padding: 12px 28px; cursor: pointer; font-size: 15px; }
        .btn.secondary { background: #334155; }
        .controls { display: flex; flex-direction: column; align-items: center; gap: 16px; margin-top: 20px; }
        .spinner { width: 56px; height: 56px; border: 4px solid #334155; border-top-color: #0ea5e9; border-radius: 50%;
                   animation: spin 1s linear infinite; }
        @keyframes spin { to { transform: rotate(360deg); } }
        .compare { position: relative; aspect-ratio: 16/9; border-radius: 12px; overflow: hidden; cursor: ew-resize;
                   user-select: none; border: 1px solid #334155; }
        .compare img { position: absolute; inset: 0; width: 100%; height: 100%; object-fit: contain; background: #0f172a; }
        .compare .handle { position: absolute; top: 0; bottom: 0; width: 4px; background: #0ea5e9; }
        .grid { display: grid; grid-template-columns: 1fr 1fr; gap: 16px; }
        .grid img, .grid video { width: 100%; border-radius: 12px; background: #000; }
        .label { font-size: 12px; text-transform: uppercase; letter-spacing: 0.05em; color: #94a3b8; margin-bottom: 6px; }
        .hidden { display: none !important; }
        .row { display: flex; justify-content: space-between; align-items: center; margin-bottom: 20px; }
    </style>
</head>
<body>
<header>
    <span class="brand">ClearView AI</span>
    <nav>
        <button id="modeImage" onclick="switchMode('image')">Image</button>
        <button id="modeVideo" onclick="switchMode('video')">Video</button>
    </nav>
</header>
<main>
    <h1 id="title"></h1>
    <p class="lead" id="lead"></p>

    <div id="resultCard" class="card hidden">
        <div class="row">
            <h2>Result</h2>
            <button class="btn secondary" onclick="post('/api/reset')">Process New File</button>
        </div>
        <div id="imageCompare" class="compare hidden">
            <img id="processedImg" alt="Processed">
            <img id="originalImg" alt="Original">
            <div class="handle" id="handle"></div>
        </div>
        <div id="videoCompare" class="grid hidden">
            <div><div class="label">Original Reference</div><img id="referenceImg" alt="Original"></div>
            <div><div class="label">Generated Clean Video</div><video id="resultVideo" controls></video></div>
        </div>
        <div class="controls"><a id="downloadLink" class="btn" href="/api/download">Download</a></div>
    </div>

    <div id="workCard" class="card">
        <div id="dropzone" class="dropzone">
            <p id="dropLabel"></p>
            <p class="lead" style="margin: 8px 0 0">Click to browse or drop an image here</p>
            <input type="file" id="fileInput" accept="image/*" class="hidden">
        </div>
        <div id="previewBox" class="hidden">
            <div class="preview">
                <img id="previewImg" alt="Preview">
                <button class="btn secondary clear" onclick="clearFile()">✕</button>
            </div>
            <div id="promptBox" class="hidden" style="margin-top: 20px">
                <label>Describe the video scene</label>
                <textarea id="prompt" placeholder="e.g. A cinematic drone shot of a mountain range at sunset..."></textarea>
                <div class="note">A fresh, watermark-free video is generated from your reference image and prompt.
                    A paid API key is required.</div>
            </div>
        </div>
        <div id="keyBox" class="hidden" style="margin-top: 20px">
            <label>Select an API key</label>
            <input type="password" id="apiKey" placeholder="Gemini API key">
            <div class="controls"><button class="btn secondary" onclick="selectKey()">Use this key</button></div>
        </div>
        <div id="errorBox" class="error hidden"></div>
        <div class="controls">
            <div id="progress" class="hidden" style="text-align: center">
                <div class="spinner" style="margin: 0 auto 12px"></div>
                <p id="progressText"></p>
                <p class="lead" style="margin: 4px 0 0; font-size: 12px">This might take a few moments</p>
            </div>
            <button id="launchBtn" class="btn hidden" onclick="launch()"></button>
        </div>
    </div>
</main>
<script>
    let state = null;
    let pollTimer = null;
    let slider = 50;
    let dragging = false;

    const $ = (id) => document.getElementById(id);
    const show = (id, visible) => $(id).classList.toggle('hidden', !visible);

    async function refresh() {
        const res = await fetch('/api/state');
        render(await res.json());
    }

    async function post(url, body) {
        const res = await fetch(url, {
            method: 'POST',
            headers: body ? { 'Content-Type': 'application/json' } : {},
            body: body ? JSON.stringify(body) : undefined,
        });
        const data = await res.json();
        render(data.state);
        return data;
    }

    function switchMode(mode) { post('/api/mode', { mode }); }

    async function clearFile() {
        const res = await fetch('/api/upload', { method: 'DELETE' });
        render((await res.json()).state);
    }

    async function upload(file) {
        const form = new FormData();
        form.append('file', file);
        const res = await fetch('/api/upload', { method: 'POST', body: form });
        render((await res.json()).state);
    }

    async function launch() {
        if (state.mode === 'video') {
            await post('/api/prompt', { prompt: $('prompt').value });
        }
        await post('/api/launch');
    }

    function selectKey() {
        post('/api/credential', { api_key: $('apiKey').value });
        $('apiKey').value = '';
    }

    function render(next) {
        state = next;
        const video = state.mode === 'video';
        $('modeImage').classList.toggle('active', !video);
        $('modeVideo').classList.toggle('active', video);
        $('title').textContent = video ? 'Re-imagine Video Cleanly' : 'Remove Watermarks Instantly';
        $('lead').textContent = video
            ? 'Upload a reference frame and generate a high-quality, watermark-free video from your prompt.'
            : 'Upload an image and let AI erase watermarks, text, and logos while preserving the background.';
        $('dropLabel').textContent = video ? 'Upload Reference Frame for Video' : 'Upload Image to Clean';

        const completed = state.status === 'completed' && state.result;
        show('resultCard', completed);
        show('workCard', !completed);

        if (completed) {
            const r = state.result;
            show('imageCompare', r.kind === 'image');
            show('videoCompare', r.kind === 'video');
            if (r.kind === 'image') {
                $('processedImg').src = r.processed_url;
                $('originalImg').src = r.original_url;
                applySlider();
            } else {
                $('referenceImg').src = r.original_url;
                if ($('resultVideo').getAttribute('src') !== r.processed_url) {
                    $('resultVideo').src = r.processed_url;
                }
            }
            $('downloadLink').setAttribute('download', r.download_name);
            $('downloadLink').textContent = r.kind === 'video' ? 'Download Video' : 'Download Image';
        }

        show('dropzone', !state.preview_url);
        show('previewBox', !!state.preview_url);
        if (state.preview_url) { $('previewImg').src = state.preview_url; }
        show('promptBox', video);
        if (document.activeElement !== $('prompt')) { $('prompt').value = state.prompt; }
        show('keyBox', !state.has_credential);

        $('errorBox').textContent = state.error || '';
        show('errorBox', !!state.error);

        const processing = state.status === 'processing' || state.status === 'uploading';
        show('progress', processing);
        $('progressText').textContent = video ? 'Veo is dreaming up your video...' : 'AI is removing artifacts...';
        show('launchBtn', !!state.preview_url && !processing);
        $('launchBtn').textContent = video ? 'Generate Clean Video' : 'Remove Watermark';

        if (processing && !pollTimer) {
            pollTimer = setInterval(refresh, 1500);
        } else if (!processing && pollTimer) {
            clearInterval(pollTimer);
            pollTimer = null;
        }
    }

    function applySlider() {
        $('originalImg').style.clipPath = `inset(0 ${100 - slider}% 0 0)`;
        $('handle').style.left = `calc(${slider}% - 2px)`;
    }

    const compare = $('imageCompare');
    compare.addEventListener('mousedown', () => { dragging = true; });
    ['mouseup', 'mouseleave'].forEach((evt) => compare.addEventListener(evt, () => { dragging = false; }));
    compare.addEventListener('mousemove', (e) => {
        if (!dragging) return;
        const rect = compare.getBoundingClientRect();
        const x = Math.max(0, Math.min(e.clientX - rect.left, rect.width));
        slider = (x / rect.width) * 100;
        applySlider();
    });

    const dropzone = $('dropzone');
    dropzone.addEventListener('click', () => $('fileInput').click());
    $('fileInput').addEventListener('change', (e) => {
        if (e.target.files.length) { upload(e.target.files[0]); }
        e.target.value = '';
    });
    dropzone.addEventListener('dragover', (e) => { e.preventDefault(); dropzone.classList.add('dragging'); });
    dropzone.addEventListener('dragleave', () => dropzone.classList.remove('dragging'));
    dropzone.addEventListener('drop', (e) => {
        e.preventDefault();
        dropzone.classList.remove('dragging');
        const file = e.dataTransfer.files[0];
        if (file && file.type.startsWith('image/')) { upload(file); }
    });

    refresh();
</script>
</body>
</html>
"###;

    Html(html.to_string())
}
